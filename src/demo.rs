//! Built-in fixture used when no `--fixture` file is given.

use indoc::indoc;
use serde_json::{Value, json};

use crate::transport::{Fixture, MemoryTransport, TransportError};

fn system() -> Value {
    json!({
        "nodes": [
            {"key": "host", "attributes": {"label": "host", "x": 0.0, "y": 0.0}},
            {"key": "cpu0", "attributes": {
                "label": "CPU 0", "x": -1.0, "y": 1.0,
                "backends": ["perf", "roofline"], "entity": "cpu0"
            }},
            {"key": "app", "attributes": {
                "label": "app (pid 4211)", "x": 1.0, "y": 1.0,
                "backend": "perf", "entity": "4211"
            }},
            {"key": "l3", "attributes": {
                "label": "L3 cache", "x": -1.0, "y": 2.0, "backend": "roofline"
            }},
            {"key": "gpu", "attributes": {
                "label": "GPU", "x": 1.0, "y": 2.0, "backend": "gpu"
            }}
        ],
        "edges": [
            {"source": "host", "target": "cpu0"},
            {"source": "host", "target": "app"},
            {"source": "cpu0", "target": "l3"},
            {"source": "host", "target": "gpu"}
        ]
    })
}

fn tree() -> Value {
    json!({
        "name": "app", "pid": "4211", "tid": "4211",
        "children": [
            {"name": "app-worker", "pid": "4211", "tid": "4213",
             "children": [{"name": "app-io", "pid": "4211", "tid": "4214"}]},
            {"name": "sh", "pid": "4220", "tid": "4220"}
        ]
    })
}

fn main_flame() -> Value {
    json!({
        "name": "all", "value": 1000.0,
        "children": [
            {"name": "main", "value": 940.0, "file": "main.c", "children": [
                {"name": "parse_input", "value": 610.0, "file": "parse.c", "children": [
                    {"name": "tokenize", "value": 420.0, "file": "parse.c"},
                    {"name": "memcpy", "value": 30.0},
                    {"name": "strlen", "value": 12.0}
                ]},
                {"name": "compute", "value": 300.0, "file": "main.c"},
                {"name": "log_line", "value": 20.0, "file": "main.c"}
            ]},
            {"name": "_start", "value": 60.0}
        ]
    })
}

fn worker_flame() -> Value {
    json!({
        "name": "all", "value": 500.0,
        "children": [
            {"name": "worker_loop", "value": 480.0, "file": "main.c", "children": [
                {"name": "compute", "value": 470.0, "file": "main.c"},
                {"name": "futex_wait", "value": 10.0}
            ]},
            {"name": "clone", "value": 20.0}
        ]
    })
}

const MAIN_C: &str = indoc! {r#"
    #include "parse.h"

    static long compute(const struct input *in)
    {
    	long acc = 0;
    	for (size_t i = 0; i < in->len; i++)
    		acc += in->values[i] * in->values[i];
    	return acc;
    }

    int main(int argc, char **argv)
    {
    	struct input in = parse_input(argv[1]);
    	printf("%ld\n", compute(&in));
    	return 0;
    }
"#};

const PARSE_C: &str = indoc! {r#"
    #include "parse.h"

    struct input parse_input(const char *path)
    {
    	struct input in = {0};
    	char *text = read_file(path);
    	tokenize(text, &in);
    	free(text);
    	return in;
    }
"#};

fn roofline() -> Value {
    json!({
        "peak": 96.0,
        "ceilings": [
            {"name": "L1", "bandwidth": 380.0},
            {"name": "L2", "bandwidth": 160.0},
            {"name": "L3", "bandwidth": 70.0},
            {"name": "DRAM", "bandwidth": 18.5}
        ],
        "points": [
            {"name": "compute", "intensity": 0.25, "performance": 3.9},
            {"name": "tokenize", "intensity": 0.06, "performance": 0.8},
            {"name": "worker_loop", "intensity": 2.5, "performance": 31.0}
        ]
    })
}

pub fn fixture_value() -> Value {
    json!({
        "sessions": [
            {
                "id": "demo",
                "label": "demo run",
                "system": system(),
                "tree": tree(),
                "flame_graphs": {
                    "4211_4211": main_flame(),
                    "4211_4213": worker_flame()
                },
                "sources": {"main.c": MAIN_C, "parse.c": PARSE_C},
                "general_analysis": {"roofline": roofline()}
            },
            {
                "id": "broken",
                "label": "broken run",
                "load_status": 500
            }
        ]
    })
}

pub fn fixture() -> Result<Fixture, TransportError> {
    Ok(serde_json::from_value(fixture_value())?)
}

pub fn transport() -> Result<MemoryTransport, TransportError> {
    fixture().map(MemoryTransport::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::SystemGraph;
    use crate::session::{SessionId, SessionRequest, form};
    use crate::transport::{ResponseKind, Transport};

    #[test]
    fn demo_graph_decodes() {
        let transport = transport().expect("demo fixture");
        let value = transport
            .system_graph(&SessionId::new("demo"))
            .expect("graph");
        let graph = SystemGraph::from_value(value).expect("decode");
        assert_eq!(graph.nodes.len(), 5);
        assert_eq!(graph.node("cpu0").map(|n| n.backends().len()), Some(2));
    }

    #[test]
    fn broken_session_fails_with_server_error() {
        let transport = transport().expect("demo fixture");
        let err = transport
            .system_graph(&SessionId::new("broken"))
            .unwrap_err();
        assert!(err.is_server_error());
    }

    #[test]
    fn flame_graphs_are_keyed_by_pid_and_tid() {
        let transport = transport().expect("demo fixture");
        let request = SessionRequest {
            session: SessionId::new("demo"),
            entity_id: None,
            node_id: None,
            module_name: None,
            form: form([("pid", "4211"), ("tid", "4213"), ("threshold", "0")]),
            kind: ResponseKind::Json,
        };
        let response = transport.post(&request).expect("flame graph");
        assert_eq!(
            response.as_json().and_then(|v| v["name"].as_str()),
            Some("all")
        );
    }
}
