// ---------------------------------------------------------------------------
// Integration tests for flixrec-engine JSON-RPC 2.0 / NDJSON protocol
// ---------------------------------------------------------------------------
//
// Each test spawns a fresh flixrec-engine binary and communicates via
// stdin/stdout using newline-delimited JSON-RPC 2.0 messages.
// ---------------------------------------------------------------------------

use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// Helper
// ---------------------------------------------------------------------------

const BIN: &str = env!("CARGO_BIN_EXE_flixrec-engine");

struct EngineProcess {
	child: Child,
	reader: BufReader<std::process::ChildStdout>,
	next_id: AtomicU64,
}

impl EngineProcess {
	fn spawn() -> Self {
		Self::spawn_with_args(&[])
	}

	fn spawn_with_data(path: &Path) -> Self {
		let path = path.to_str().expect("non-utf8 temp path");
		Self::spawn_with_args(&["--data", path])
	}

	fn spawn_with_args(args: &[&str]) -> Self {
		let mut child = Command::new(BIN)
			.args(args)
			.env_remove("FLIXREC_DATA")
			.stdin(Stdio::piped())
			.stdout(Stdio::piped())
			.stderr(Stdio::null())
			.spawn()
			.expect("failed to spawn flixrec-engine");

		let stdout = child.stdout.take().expect("no stdout");
		let reader = BufReader::new(stdout);

		Self {
			child,
			reader,
			next_id: AtomicU64::new(1),
		}
	}

	fn write_raw(&mut self, line: &str) {
		let stdin = self.child.stdin.as_mut().expect("no stdin");
		stdin.write_all(line.as_bytes()).unwrap();
		stdin.write_all(b"\n").unwrap();
		stdin.flush().unwrap();
	}

	fn read_message(&mut self) -> Value {
		loop {
			let mut buf = String::new();
			let bytes_read = self
				.reader
				.read_line(&mut buf)
				.expect("failed to read from stdout");
			if bytes_read == 0 {
				panic!("unexpected EOF while waiting for a response");
			}
			let buf = buf.trim();
			if buf.is_empty() {
				continue;
			}
			return serde_json::from_str(buf)
				.unwrap_or_else(|e| panic!("invalid JSON from engine: {e}\nline: {buf}"));
		}
	}

	fn send(&mut self, method: &str, params: Value) -> RpcResponse {
		let id = self.next_id.fetch_add(1, Ordering::SeqCst);
		let request = json!({
			"jsonrpc": "2.0",
			"id": id,
			"method": method,
			"params": params,
		});
		self.write_raw(&serde_json::to_string(&request).unwrap());

		let parsed = self.read_message();
		let resp_id = parsed["id"].as_u64().expect("response id is not u64");
		assert_eq!(resp_id, id, "response id mismatch");
		if let Some(error) = parsed.get("error") {
			return RpcResponse::Error(error.clone());
		}
		RpcResponse::Ok(parsed.get("result").cloned().unwrap_or(Value::Null))
	}

	fn call(&mut self, method: &str, params: Value) -> Value {
		match self.send(method, params) {
			RpcResponse::Ok(v) => v,
			RpcResponse::Error(e) => panic!("expected success, got error: {e}"),
		}
	}

	fn call_err(&mut self, method: &str, params: Value) -> Value {
		match self.send(method, params) {
			RpcResponse::Error(e) => e,
			RpcResponse::Ok(v) => panic!("expected error, got success: {v}"),
		}
	}
}

impl Drop for EngineProcess {
	fn drop(&mut self) {
		drop(self.child.stdin.take());
		let _ = self.child.wait();
	}
}

#[derive(Debug)]
enum RpcResponse {
	Ok(Value),
	Error(Value),
}

fn ids(result: &Value) -> Vec<u64> {
	result["items"]
		.as_array()
		.expect("items is not an array")
		.iter()
		.map(|i| i["id"].as_u64().unwrap())
		.collect()
}

fn write_dataset(value: &Value) -> tempfile::NamedTempFile {
	let mut file = tempfile::NamedTempFile::new().unwrap();
	file.write_all(value.to_string().as_bytes()).unwrap();
	file.flush().unwrap();
	file
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[test]
fn catalog_lookups() {
	let mut proc = EngineProcess::spawn();

	let items = proc.call("catalog/items", json!({}));
	assert_eq!(items["items"].as_array().unwrap().len(), 10);

	let item = proc.call("catalog/item", json!({ "id": 5 }));
	assert_eq!(item["item"]["title"], "Breaking Bad");

	let user = proc.call("catalog/user", json!({ "id": 1 }));
	assert_eq!(user["user"]["viewed"], json!([1, 3, 5, 8]));

	let err = proc.call_err("catalog/item", json!({ "id": 404 }));
	assert_eq!(err["code"], -32000);
	assert_eq!(err["data"]["recommendCode"], "RECOMMEND_ITEM_NOT_FOUND");
}

// ---------------------------------------------------------------------------
// Recommendations
// ---------------------------------------------------------------------------

#[test]
fn content_based_sample_scenario() {
	let mut proc = EngineProcess::spawn();
	let result = proc.call("recommend/contentBased", json!({ "userId": 1, "n": 5 }));
	let got = ids(&result);
	assert_eq!(got, vec![9, 6]);
	for viewed in [1, 3, 5, 8] {
		assert!(!got.contains(&viewed));
	}
}

#[test]
fn collaborative_and_hybrid() {
	let mut proc = EngineProcess::spawn();
	let collab = proc.call("recommend/collaborative", json!({ "userId": 3, "n": 5 }));
	assert_eq!(ids(&collab), vec![1, 8]);

	let content = proc.call("recommend/contentBased", json!({ "userId": 3, "n": 5 }));
	let all_content = proc.call(
		"recommend/hybrid",
		json!({ "userId": 3, "n": 5, "contentWeight": 1.0 }),
	);
	assert_eq!(ids(&all_content), ids(&content));

	let all_collab = proc.call(
		"recommend/hybrid",
		json!({ "userId": 3, "n": 5, "contentWeight": 0.0 }),
	);
	assert_eq!(ids(&all_collab), ids(&collab));
}

#[test]
fn zero_count_returns_empty_list() {
	let mut proc = EngineProcess::spawn();
	for method in ["recommend/contentBased", "recommend/collaborative", "recommend/hybrid"] {
		let result = proc.call(method, json!({ "userId": 2, "n": 0 }));
		assert!(ids(&result).is_empty(), "{method} returned items for n=0");
	}
}

#[test]
fn unknown_user_and_bad_weight() {
	let mut proc = EngineProcess::spawn();
	let err = proc.call_err("recommend/contentBased", json!({ "userId": 99 }));
	assert_eq!(err["data"]["recommendCode"], "RECOMMEND_USER_NOT_FOUND");

	let err = proc.call_err(
		"recommend/hybrid",
		json!({ "userId": 1, "contentWeight": -0.2 }),
	);
	assert_eq!(err["code"], -32602);
}

#[test]
fn similar_items() {
	let mut proc = EngineProcess::spawn();
	let result = proc.call("recommend/similar", json!({ "itemId": 4, "n": 4 }));
	assert_eq!(ids(&result), vec![10]);
}

// ---------------------------------------------------------------------------
// Mutations
// ---------------------------------------------------------------------------

#[test]
fn rating_rebuilds_engine() {
	let mut proc = EngineProcess::spawn();
	let info = proc.call("engine/info", json!({}));
	assert_eq!(info["version"], 1);
	assert_eq!(info["matrixRows"], 5);
	assert_eq!(info["matrixCols"], 10);

	let result = proc.call(
		"ratings/add",
		json!({ "userId": 1, "itemId": 9, "rating": 4.5 }),
	);
	assert_eq!(result["replaced"], false);
	assert_eq!(result["version"], 2);

	// Item 9 is now viewed, leaving only item 6.
	let recs = proc.call("recommend/contentBased", json!({ "userId": 1 }));
	assert_eq!(ids(&recs), vec![6]);

	let user = proc.call("catalog/user", json!({ "id": 1 }));
	assert_eq!(user["user"]["liked"], json!([1, 5, 9]));

	let info = proc.call("engine/info", json!({}));
	assert_eq!(info["interactions"], 18);
}

#[test]
fn rating_validation() {
	let mut proc = EngineProcess::spawn();
	let err = proc.call_err(
		"ratings/add",
		json!({ "userId": 1, "itemId": 2, "rating": 7.0 }),
	);
	assert_eq!(err["code"], -32602);

	let err = proc.call_err(
		"ratings/add",
		json!({ "userId": 1, "itemId": 200, "rating": 3.0 }),
	);
	assert_eq!(err["data"]["recommendCode"], "RECOMMEND_ITEM_NOT_FOUND");

	let info = proc.call("engine/info", json!({}));
	assert_eq!(info["version"], 1);
}

#[test]
fn views_and_likes() {
	let mut proc = EngineProcess::spawn();
	let result = proc.call("views/add", json!({ "userId": 1, "itemId": 6 }));
	assert_eq!(result, json!({ "changed": true, "version": 2 }));

	let result = proc.call("views/add", json!({ "userId": 1, "itemId": 6 }));
	assert_eq!(result, json!({ "changed": false, "version": 2 }));

	let recs = proc.call("recommend/contentBased", json!({ "userId": 1 }));
	assert_eq!(ids(&recs), vec![9]);

	let result = proc.call(
		"likes/set",
		json!({ "userId": 1, "itemId": 6, "liked": true }),
	);
	assert_eq!(result["changed"], true);
	assert_eq!(result["version"], 3);
}

// ---------------------------------------------------------------------------
// Protocol
// ---------------------------------------------------------------------------

#[test]
fn unknown_method_and_parse_error() {
	let mut proc = EngineProcess::spawn();
	let err = proc.call_err("recommend/popular", json!({}));
	assert_eq!(err["code"], -32601);

	proc.write_raw("{ not json");
	let msg = proc.read_message();
	assert_eq!(msg["id"], 0);
	assert_eq!(msg["error"]["code"], -32700);

	// The server keeps going after a bad line.
	let info = proc.call("engine/info", json!({}));
	assert_eq!(info["items"], 10);
}

// ---------------------------------------------------------------------------
// Custom datasets
// ---------------------------------------------------------------------------

#[test]
fn custom_dataset_with_sparse_ids() {
	let data = json!({
		"items": [
			{ "id": 2, "categories": ["A"], "quality": 9.0, "features": [1.0, 0.0] },
			{ "id": 5, "categories": ["A"], "quality": 9.0, "features": [0.9, 0.1] },
			{ "id": 9, "categories": ["B"], "quality": 9.0, "features": [0.0, 1.0] }
		],
		"users": [
			{ "id": 1, "preferences": { "categories": ["A", "B"], "minQuality": 5.0 },
			  "viewed": [2], "liked": [2] },
			{ "id": 4, "preferences": { "categories": ["A"], "minQuality": 5.0 } }
		],
		"interactions": [
			{ "userId": 1, "itemId": 2, "strength": 5.0 },
			{ "userId": 4, "itemId": 2, "strength": 4.0 },
			{ "userId": 4, "itemId": 9, "strength": 3.0 }
		]
	});
	let file = write_dataset(&data);
	let mut proc = EngineProcess::spawn_with_data(file.path());

	let info = proc.call("engine/info", json!({}));
	assert_eq!(info["matrixRows"], 4);
	assert_eq!(info["matrixCols"], 9);

	let content = proc.call("recommend/contentBased", json!({ "userId": 1 }));
	assert_eq!(ids(&content), vec![5, 9]);

	let collab = proc.call("recommend/collaborative", json!({ "userId": 1 }));
	assert_eq!(ids(&collab), vec![9]);
}

#[test]
fn malformed_features_abort_startup() {
	let data = json!({
		"items": [
			{ "id": 1, "categories": ["A"], "quality": 9.0, "features": [1.0, 0.0] },
			{ "id": 2, "categories": ["A"], "quality": 9.0, "features": [1.0] }
		]
	});
	let file = write_dataset(&data);
	let status = Command::new(BIN)
		.args(["--data", file.path().to_str().unwrap()])
		.stdin(Stdio::null())
		.stdout(Stdio::null())
		.stderr(Stdio::null())
		.status()
		.expect("failed to run flixrec-engine");
	assert!(!status.success());
}
