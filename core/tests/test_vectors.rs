//! Verify request building and response decoding against JSON test vectors
//! stored in `test-vectors/`.
//!
//! Each vector file describes inputs, expected requests, simulated responses,
//! and expected outcomes. Bodies are compared as parsed JSON so field order
//! does not matter.

use grafana_core::decode::decode_json;
use grafana_core::request::build_request;
use grafana_core::{
    BasicAuth, Client, ClientError, Config, DashboardSaveResponse, HttpMethod, HttpResponse, Query,
};
use pretty_assertions::assert_eq;
use serde_json::Value;

fn string_pairs(value: &Value) -> Vec<(String, String)> {
    value
        .as_array()
        .map(|pairs| {
            pairs
                .iter()
                .map(|pair| {
                    let arr = pair.as_array().unwrap();
                    (arr[0].as_str().unwrap().to_string(), arr[1].as_str().unwrap().to_string())
                })
                .collect()
        })
        .unwrap_or_default()
}

fn config_from(value: &Value) -> Config {
    let mut config = Config::default();
    if let Some(key) = value["api_key"].as_str() {
        config.api_key = Some(key.to_string());
    }
    if let Some(org_id) = value["org_id"].as_i64() {
        config.org_id = org_id;
    }
    if let Some(auth) = value["basic_auth"].as_array() {
        config.basic_auth = Some(BasicAuth::new(
            auth[0].as_str().unwrap(),
            auth[1].as_str().unwrap(),
        ));
    }
    config.http_headers = string_pairs(&value["http_headers"]);
    config
}

// ---------------------------------------------------------------------------
// Build
// ---------------------------------------------------------------------------

#[test]
fn build_test_vectors() {
    let raw = include_str!("../../test-vectors/build.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let client = Client::new(case["base_url"].as_str().unwrap(), config_from(&case["config"]))
            .unwrap();
        let input = &case["input"];
        let method: HttpMethod = input["method"].as_str().unwrap().parse().unwrap();
        let query: Query = string_pairs(&input["query"]).into_iter().collect();
        let body = input
            .get("body")
            .map(|b| serde_json::to_vec(b).unwrap());

        let req = build_request(
            client.config(),
            client.base_url(),
            method,
            input["path"].as_str().unwrap(),
            &query,
            body.as_deref(),
        )
        .unwrap();

        let expected = &case["expected_request"];
        assert_eq!(req.method.as_str(), expected["method"].as_str().unwrap(), "{name}: method");
        assert_eq!(req.url, expected["url"].as_str().unwrap(), "{name}: url");
        assert_eq!(req.headers, string_pairs(&expected["headers"]), "{name}: headers");
        match expected.get("body") {
            Some(expected_body) => {
                let sent: Value = serde_json::from_slice(req.body.as_deref().unwrap()).unwrap();
                assert_eq!(&sent, expected_body, "{name}: body");
            }
            None => assert!(req.body.is_none(), "{name}: body should be None"),
        }
    }
}

// ---------------------------------------------------------------------------
// Decode
// ---------------------------------------------------------------------------

#[test]
fn decode_test_vectors() {
    let raw = include_str!("../../test-vectors/decode.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let sim = &case["simulated_response"];
        let response = HttpResponse {
            status: sim["status"].as_u64().unwrap() as u16,
            headers: Vec::new(),
            body: sim["body"].as_str().unwrap().as_bytes().to_vec(),
        };
        let result = decode_json::<DashboardSaveResponse>(&response);

        if let Some(expected_error) = case.get("expected_error") {
            let err = result.unwrap_err();
            let status = expected_error["status"].as_u64().unwrap() as u16;
            match expected_error["kind"].as_str().unwrap() {
                "Api" => {
                    assert!(matches!(err, ClientError::Api { .. }), "{name}: expected Api, got {err:?}");
                    assert_eq!(err.message(), expected_error["message"].as_str(), "{name}: message");
                }
                "Decode" => {
                    assert!(matches!(err, ClientError::Decode { .. }), "{name}: expected Decode, got {err:?}");
                }
                other => panic!("{name}: unknown expected_error kind: {other}"),
            }
            assert_eq!(err.status(), Some(status), "{name}: status");
        } else {
            let decoded = result.unwrap();
            let expected: DashboardSaveResponse =
                serde_json::from_value(case["expected_result"].clone()).unwrap();
            assert_eq!(decoded, expected, "{name}: decoded result");
        }
    }
}
