use std::io;
use std::time::Duration;

use crossterm::event::Event;

use crate::drivers::InputDriver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlFlow {
    Continue,
    Quit,
}

/// Drives the UI thread: polls the input driver and hands each event to a
/// handler. Request results arrive through the handler's idle ticks.
pub struct EventLoop<D> {
    driver: D,
    poll_interval: Duration,
}

impl<D: InputDriver> EventLoop<D> {
    pub fn new(driver: D, poll_interval: Duration) -> Self {
        Self {
            driver,
            poll_interval,
        }
    }

    pub fn driver(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Runs until the handler returns [`ControlFlow::Quit`].
    ///
    /// The handler gets `None` once per poll interval and `Some(event)` for
    /// every input event.
    pub fn run<F>(&mut self, mut handler: F) -> io::Result<()>
    where
        F: FnMut(&mut D, Option<Event>) -> io::Result<ControlFlow>,
    {
        loop {
            if let ControlFlow::Quit = handler(&mut self.driver, None)? {
                break;
            }

            if self.driver.poll(self.poll_interval)? {
                // Drain bursts (drags, wheel) before the next redraw.
                loop {
                    let event = self.driver.read()?;
                    if let ControlFlow::Quit = handler(&mut self.driver, Some(event))? {
                        return Ok(());
                    }
                    if !self.driver.poll(Duration::from_millis(0))? {
                        break;
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use crossterm::event::{KeyCode, KeyEvent};

    use super::*;

    #[derive(Default)]
    struct ScriptedDriver {
        events: VecDeque<Event>,
    }

    impl InputDriver for ScriptedDriver {
        fn poll(&mut self, _timeout: Duration) -> io::Result<bool> {
            Ok(!self.events.is_empty())
        }

        fn read(&mut self) -> io::Result<Event> {
            self.events
                .pop_front()
                .ok_or_else(|| io::Error::other("no scripted event"))
        }

        fn set_mouse_capture(&mut self, _enabled: bool) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn bursts_are_drained_before_next_tick() {
        let driver = ScriptedDriver {
            events: [KeyCode::Char('a'), KeyCode::Char('b'), KeyCode::Esc]
                .into_iter()
                .map(|code| Event::Key(KeyEvent::from(code)))
                .collect(),
        };
        let mut seen = Vec::new();
        let mut ticks = 0;
        EventLoop::new(driver, Duration::from_millis(1))
            .run(|_, event| {
                match event {
                    None => ticks += 1,
                    Some(Event::Key(key)) if key.code == KeyCode::Esc => {
                        return Ok(ControlFlow::Quit);
                    }
                    Some(event) => seen.push(event),
                }
                Ok(ControlFlow::Continue)
            })
            .expect("loop");
        assert_eq!(ticks, 1);
        assert_eq!(seen.len(), 2);
    }
}
