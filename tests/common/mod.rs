//! Shared mock servers for integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use alloy::consensus::TxEnvelope;
use alloy::eips::eip2718::Decodable2718;
use alloy::primitives::hex;
use serde_json::{json, Value};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use chainops::config::RpcConfig;

/// What the mock node answers for one JSON-RPC method.
#[derive(Debug, Clone)]
pub enum Reply {
    Result(Value),
    Error(i64, String),
    /// One reply per call, in order; the last one repeats.
    Sequence(Vec<Reply>),
}

/// JSON-RPC node backed by wiremock. Requests are answered by method name
/// with the request id echoed back; unknown methods get `-32601`.
///
/// A reply registered as `method@tag` (for example
/// `eth_getTransactionCount@pending`) wins over the plain method name when
/// the last request param is that block tag.
pub struct MockNode {
    pub server: MockServer,
    calls: Arc<Mutex<Vec<(String, Value)>>>,
}

struct Replies {
    by_key: HashMap<String, Reply>,
    served: HashMap<String, usize>,
}

impl Replies {
    fn next(&mut self, name: &str, params: &Value) -> Option<Reply> {
        let tagged = params
            .as_array()
            .and_then(|p| p.last())
            .and_then(Value::as_str)
            .map(|tag| format!("{}@{}", name, tag))
            .filter(|key| self.by_key.contains_key(key));
        let key = tagged.unwrap_or_else(|| name.to_string());

        let reply = self.by_key.get(&key)?.clone();
        let served = self.served.entry(key).or_default();
        let reply = match reply {
            Reply::Sequence(steps) => steps.get(*served).or(steps.last()).cloned()?,
            other => other,
        };
        *served += 1;
        Some(reply)
    }
}

impl MockNode {
    pub async fn start(replies: Vec<(&str, Reply)>) -> Self {
        let server = MockServer::start().await;
        let replies = Mutex::new(Replies {
            by_key: replies
                .into_iter()
                .map(|(name, reply)| (name.to_string(), reply))
                .collect(),
            served: HashMap::new(),
        });
        let calls = Arc::new(Mutex::new(Vec::new()));
        let seen = calls.clone();

        Mock::given(method("POST"))
            .respond_with(move |request: &Request| {
                let body: Value = serde_json::from_slice(&request.body).unwrap_or(Value::Null);
                let response = match body {
                    Value::Array(batch) => Value::Array(
                        batch.iter().map(|call| answer(&replies, &seen, call)).collect(),
                    ),
                    call => answer(&replies, &seen, &call),
                };
                ResponseTemplate::new(200).set_body_json(response)
            })
            .mount(&server)
            .await;

        Self { server, calls }
    }

    pub fn url(&self) -> String {
        self.server.uri()
    }

    pub fn rpc_config(&self) -> RpcConfig {
        RpcConfig {
            url: self.url(),
            timeout_secs: 5,
            ..Default::default()
        }
    }

    /// Methods called so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Params of every call to `name`, in order.
    pub fn params(&self, name: &str) -> Vec<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(called, _)| called == name)
            .map(|(_, params)| params.clone())
            .collect()
    }

    /// Every transaction passed to `eth_sendRawTransaction`, decoded.
    pub fn sent_transactions(&self) -> Vec<TxEnvelope> {
        self.params("eth_sendRawTransaction")
            .iter()
            .map(|params| {
                let raw = hex::decode(params[0].as_str().unwrap()).unwrap();
                TxEnvelope::decode_2718(&mut raw.as_slice()).unwrap()
            })
            .collect()
    }
}

fn answer(replies: &Mutex<Replies>, seen: &Mutex<Vec<(String, Value)>>, call: &Value) -> Value {
    let id = call.get("id").cloned().unwrap_or(Value::Null);
    let name = call.get("method").and_then(Value::as_str).unwrap_or_default();
    let params = call.get("params").cloned().unwrap_or(Value::Null);
    let reply = replies.lock().unwrap().next(name, &params);
    seen.lock().unwrap().push((name.to_string(), params));
    match reply {
        Some(Reply::Result(result)) => json!({"jsonrpc": "2.0", "id": id, "result": result}),
        Some(Reply::Error(code, message)) => {
            json!({"jsonrpc": "2.0", "id": id, "error": {"code": code, "message": message}})
        }
        Some(Reply::Sequence(_)) | None => json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": {"code": -32601, "message": format!("the method {} does not exist", name)}
        }),
    }
}

pub fn ok(result: Value) -> Reply {
    Reply::Result(result)
}

pub fn rejected(message: &str) -> Reply {
    Reply::Error(-32000, message.to_string())
}

/// 32-byte ABI word holding `value`.
pub fn word(value: u128) -> String {
    format!("0x{:064x}", value)
}

/// Transaction hash filled with `byte`.
pub fn tx_hash(byte: u8) -> Value {
    json!(format!("0x{}", hex::encode([byte; 32])))
}

/// Mined receipt for a transaction sent by [`DEV_ADDRESS`].
pub fn receipt(success: bool) -> Value {
    json!({
        "type": "0x0",
        "status": if success { "0x1" } else { "0x0" },
        "cumulativeGasUsed": "0x5208",
        "logs": [],
        "logsBloom": format!("0x{}", "0".repeat(512)),
        "transactionHash": tx_hash(0xaa),
        "transactionIndex": "0x0",
        "blockHash": tx_hash(0xbb),
        "blockNumber": "0x10",
        "gasUsed": "0x5208",
        "effectiveGasPrice": "0x3b9aca00",
        "from": DEV_ADDRESS,
        "to": DEV_ADDRESS,
        "contractAddress": null
    })
}

/// Hardhat / anvil account #0.
pub const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const DEV_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

/// A Loki `query_range` body with one stream.
pub fn loki_body(lines: &[(&str, &str)]) -> Value {
    let values: Vec<Value> = lines.iter().map(|(ts, line)| json!([ts, line])).collect();
    json!({
        "status": "success",
        "data": {
            "resultType": "streams",
            "result": [{"stream": {"container_name": "execution"}, "values": values}]
        }
    })
}
