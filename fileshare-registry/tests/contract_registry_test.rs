//! JSON-RPC contract tests for `ContractRegistry` and `RpcWallet` against a
//! scripted node.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use fileshare_core::constants::{
    SIG_FILES, SIG_FILE_COUNT, SIG_REGISTERED_USERS, SIG_SIGNUP, SIG_UPLOAD_FILE,
};
use fileshare_core::{ContentAddress, FileshareError, Identity, IdentityProvider, RegistryClient};
use fileshare_registry::abi::{self, FileRecord};
use fileshare_registry::{ContractConfig, ContractRegistry, RpcConfig, RpcTransport, RpcWallet, WalletConfig};
use serde_json::{json, Value};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

const CONTRACT: &str = "0x5fbdb2315678afecb367f032d93f642f64180aa3";
const ACCOUNT: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
const TX_HASH: &str = "0x9fc76417374aa880d4449a1f7f31ec597f00b1f6f3dd2d66f4c9c6c445836d8b";

/// Minimal ledger node: answers the contract's view calls and mines every
/// transaction with a fixed status.
struct LedgerNode {
    files: Vec<FileRecord>,
    registered: bool,
    tx_status: &'static str,
    /// Receipt polls answered with `null` before the receipt appears
    pending_polls: usize,
    polls: AtomicUsize,
    /// Error object returned for `eth_sendTransaction`, as nodes that
    /// simulate before sending do for reverting calls
    send_error: Option<(i64, &'static str)>,
}

impl LedgerNode {
    fn new() -> Self {
        Self {
            files: Vec::new(),
            registered: false,
            tx_status: "0x1",
            pending_polls: 0,
            polls: AtomicUsize::new(0),
            send_error: None,
        }
    }

    fn eth_call(&self, data: &str) -> Value {
        let bytes = hex::decode(data.trim_start_matches("0x")).unwrap();
        let (sel, args) = bytes.split_at(4);

        let out = if sel == abi::selector(SIG_FILE_COUNT) {
            abi::encode_uint_return(self.files.len() as u64)
        } else if sel == abi::selector(SIG_REGISTERED_USERS) {
            abi::encode_uint_return(self.registered as u64)
        } else if sel == abi::selector(SIG_FILES) {
            let index = abi::decode_uint(args).unwrap() as usize;
            let record = index
                .checked_sub(1)
                .and_then(|i| self.files.get(i).cloned())
                .unwrap_or(FileRecord {
                    uploader: [0; 20],
                    name: String::new(),
                    hash: String::new(),
                });
            abi::encode_file_record(&record)
        } else {
            panic!("unexpected selector {}", hex::encode(sel));
        };
        json!(format!("0x{}", hex::encode(out)))
    }
}

impl Respond for LedgerNode {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = request.body_json().unwrap();
        if let (Some((code, message)), "eth_sendTransaction") =
            (self.send_error, body["method"].as_str().unwrap())
        {
            return ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": body["id"],
                "error": { "code": code, "message": message },
            }));
        }
        let result = match body["method"].as_str().unwrap() {
            "eth_accounts" => json!([ACCOUNT]),
            "eth_call" => self.eth_call(body["params"][0]["data"].as_str().unwrap()),
            "eth_sendTransaction" => json!(TX_HASH),
            "eth_getTransactionReceipt" => {
                if self.polls.fetch_add(1, Ordering::SeqCst) < self.pending_polls {
                    Value::Null
                } else {
                    json!({ "status": self.tx_status, "blockNumber": "0x2a" })
                }
            }
            other => panic!("unexpected method {}", other),
        };
        ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": body["id"],
            "result": result,
        }))
    }
}

async fn start_node(node: LedgerNode) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST")).respond_with(node).mount(&server).await;
    server
}

fn fast_wallet(rpc: Arc<RpcTransport>) -> Arc<RpcWallet> {
    Arc::new(RpcWallet::with_config(
        rpc,
        WalletConfig {
            receipt_poll_ms: 10,
            confirmation_timeout_seconds: Some(2),
        },
    ))
}

fn registry(server: &MockServer) -> ContractRegistry {
    let rpc = Arc::new(RpcTransport::with_config(RpcConfig::new(server.uri())).unwrap());
    let wallet = fast_wallet(rpc.clone());
    ContractRegistry::new(rpc, wallet, ContractConfig::new(CONTRACT).unwrap())
}

fn account() -> Identity {
    Identity::new(ACCOUNT).unwrap()
}

fn doc_record() -> FileRecord {
    let mut uploader = [0u8; 20];
    uploader.copy_from_slice(&hex::decode(ACCOUNT.trim_start_matches("0x")).unwrap());
    FileRecord {
        uploader,
        name: "doc.txt".into(),
        hash: "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG".into(),
    }
}

async fn sent_methods(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| r.body_json::<Value>().unwrap()["method"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn reads_file_count_and_registration() {
    let mut node = LedgerNode::new();
    node.files = vec![doc_record(), doc_record()];
    node.registered = true;
    let server = start_node(node).await;
    let registry = registry(&server);

    assert_eq!(registry.file_count().await.unwrap(), 2);
    assert!(registry.is_registered(&account()).await.unwrap());
}

#[tokio::test]
async fn get_file_decodes_record_with_normalized_owner() {
    let mut node = LedgerNode::new();
    node.files = vec![doc_record()];
    let server = start_node(node).await;

    let entry = registry(&server).get_file(1).await.unwrap();
    assert_eq!(entry.index, 1);
    assert_eq!(entry.name, "doc.txt");
    assert_eq!(entry.owner, account());
    assert_eq!(entry.owner.as_str(), ACCOUNT.to_lowercase());
}

#[tokio::test]
async fn get_file_past_end_is_out_of_range() {
    let mut node = LedgerNode::new();
    node.files = vec![doc_record()];
    let server = start_node(node).await;
    let registry = registry(&server);

    let err = registry.get_file(5).await.unwrap_err();
    assert!(matches!(err, FileshareError::IndexOutOfRange { index: 5, count: 1 }));

    let err = registry.get_file(0).await.unwrap_err();
    assert!(matches!(err, FileshareError::IndexOutOfRange { index: 0, count: 1 }));
}

#[tokio::test]
async fn add_file_sends_upload_transaction() {
    let server = start_node(LedgerNode::new()).await;
    let address = ContentAddress::parse("bafkreiabc").unwrap();

    let receipt = registry(&server).add_file(&account(), "doc.txt", &address).await.unwrap();
    assert!(receipt.success);
    assert_eq!(receipt.tx_hash, TX_HASH);
    assert_eq!(receipt.block_number, Some(42));

    let requests = server.received_requests().await.unwrap();
    let send = requests
        .iter()
        .map(|r| r.body_json::<Value>().unwrap())
        .find(|b| b["method"] == "eth_sendTransaction")
        .unwrap();
    let tx = &send["params"][0];
    assert_eq!(tx["to"], CONTRACT);
    assert_eq!(tx["from"], ACCOUNT.to_lowercase());
    assert_eq!(
        tx["data"],
        format!("0x{}", hex::encode(abi::encode_upload_file("doc.txt", "bafkreiabc")))
    );
    assert!(tx["data"]
        .as_str()
        .unwrap()
        .starts_with(&format!("0x{}", hex::encode(abi::selector(SIG_UPLOAD_FILE)))));
}

#[tokio::test]
async fn reverted_upload_means_not_registered() {
    let mut node = LedgerNode::new();
    node.tx_status = "0x0";
    let server = start_node(node).await;
    let address = ContentAddress::parse("bafkreiabc").unwrap();

    let err = registry(&server).add_file(&account(), "doc.txt", &address).await.unwrap_err();
    assert!(matches!(err, FileshareError::NotRegistered(_)));
}

#[tokio::test]
async fn reverted_signup_means_already_registered() {
    let mut node = LedgerNode::new();
    node.tx_status = "0x0";
    let server = start_node(node).await;

    let err = registry(&server).register(&account()).await.unwrap_err();
    assert!(matches!(err, FileshareError::AlreadyRegistered(_)));

    let requests = server.received_requests().await.unwrap();
    let send = requests
        .iter()
        .map(|r| r.body_json::<Value>().unwrap())
        .find(|b| b["method"] == "eth_sendTransaction")
        .unwrap();
    assert_eq!(
        send["params"][0]["data"],
        format!("0x{}", hex::encode(abi::selector(SIG_SIGNUP)))
    );
}

#[tokio::test]
async fn wallet_waits_for_pending_receipt() {
    let mut node = LedgerNode::new();
    node.pending_polls = 2;
    let server = start_node(node).await;

    registry(&server).register(&account()).await.unwrap();

    let polls = sent_methods(&server)
        .await
        .into_iter()
        .filter(|m| m == "eth_getTransactionReceipt")
        .count();
    assert_eq!(polls, 3);
}

#[tokio::test]
async fn wallet_times_out_waiting_for_inclusion() {
    let mut node = LedgerNode::new();
    node.pending_polls = usize::MAX;
    let server = start_node(node).await;

    let rpc = Arc::new(RpcTransport::with_config(RpcConfig::new(server.uri())).unwrap());
    let wallet = RpcWallet::with_config(
        rpc,
        WalletConfig {
            receipt_poll_ms: 20,
            confirmation_timeout_seconds: Some(1),
        },
    );
    let call = fileshare_core::ContractCall::new(account(), CONTRACT, abi::encode_signup(), "signup");

    let err = wallet.sign_and_send(call).await.unwrap_err();
    assert!(matches!(err, FileshareError::Timeout(_)));
}

#[tokio::test]
async fn user_rejection_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": { "code": 4001, "message": "User denied transaction signature." }
        })))
        .mount(&server)
        .await;

    let err = registry(&server).register(&account()).await.unwrap_err();
    assert!(matches!(err, FileshareError::UserRejected));
}

#[tokio::test]
async fn wallet_reports_first_node_account() {
    let server = start_node(LedgerNode::new()).await;
    let rpc = Arc::new(RpcTransport::with_config(RpcConfig::new(server.uri())).unwrap());

    let active = RpcWallet::new(rpc).active_account().await.unwrap();
    assert_eq!(active, Some(account()));
}

#[tokio::test]
async fn unreachable_node_is_no_provider() {
    // Nothing listens on port 1.
    let rpc = Arc::new(RpcTransport::with_config(RpcConfig::new("http://127.0.0.1:1")).unwrap());
    let err = RpcWallet::new(rpc).active_account().await.unwrap_err();
    assert!(matches!(err, FileshareError::NoProvider(_)));
}

#[tokio::test]
async fn unreachable_node_is_connection_lost_for_reads() {
    let rpc = Arc::new(RpcTransport::with_config(RpcConfig::new("http://127.0.0.1:1")).unwrap());
    let wallet = Arc::new(RpcWallet::new(rpc.clone()));
    let registry = ContractRegistry::new(rpc, wallet, ContractConfig::new(CONTRACT).unwrap());

    let err = registry.file_count().await.unwrap_err();
    assert!(matches!(err, FileshareError::ConnectionLost(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn node_rejected_signup_means_already_registered() {
    let mut node = LedgerNode::new();
    node.send_error = Some((3, "execution reverted"));
    let server = start_node(node).await;

    let err = registry(&server).register(&account()).await.unwrap_err();
    assert!(matches!(err, FileshareError::AlreadyRegistered(_)));
}

#[tokio::test]
async fn node_rejected_upload_means_not_registered() {
    let mut node = LedgerNode::new();
    node.send_error = Some((
        -32603,
        "Error: VM Exception while processing transaction: reverted with reason string",
    ));
    let server = start_node(node).await;
    let address = ContentAddress::parse("bafkreiabc").unwrap();

    let err = registry(&server).add_file(&account(), "doc.txt", &address).await.unwrap_err();
    assert!(matches!(err, FileshareError::NotRegistered(_)));
}

#[tokio::test]
async fn other_node_errors_pass_through() {
    let mut node = LedgerNode::new();
    node.send_error = Some((-32000, "nonce too low"));
    let server = start_node(node).await;

    let err = registry(&server).register(&account()).await.unwrap_err();
    assert!(matches!(err, FileshareError::RpcError { code: -32000, .. }));
}

#[tokio::test]
async fn free_form_ledger_hash_is_kept_verbatim() {
    let mut odd = doc_record();
    odd.hash = "ipfs://QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG".into();
    let mut node = LedgerNode::new();
    node.files = vec![odd.clone(), doc_record()];
    let server = start_node(node).await;
    let registry = registry(&server);

    let entry = registry.get_file(1).await.unwrap();
    assert_eq!(entry.address.as_str(), odd.hash);
    assert!(!entry.address.is_canonical());
    assert!(registry.get_file(2).await.unwrap().address.is_canonical());
}
