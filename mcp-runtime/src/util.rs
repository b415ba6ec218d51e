use serde_json::Value;

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(concat!("bakul-mcp/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

pub fn to_pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}
