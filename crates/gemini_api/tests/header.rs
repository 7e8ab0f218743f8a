use gemini_api::headers::{
    build_headers, HEADER_ACCEPT, HEADER_API_KEY, HEADER_CONTENT_TYPE, HEADER_USER_AGENT,
};
use gemini_api::{GeminiApiConfig, GeminiApiError};

#[test]
fn header_map_contains_gemini_headers() {
    let config = GeminiApiConfig::new("  key-123  ")
        .with_user_agent("cowrite-test/1.0")
        .insert_header("X-Extra", " value ");

    let headers = build_headers(&config).expect("header construction");
    assert_eq!(
        headers.get(HEADER_API_KEY).expect("api key"),
        &"key-123".to_owned()
    );
    assert_eq!(
        headers.get(HEADER_ACCEPT).expect("accept"),
        &"application/json".to_owned()
    );
    assert_eq!(
        headers.get(HEADER_CONTENT_TYPE).expect("content-type"),
        &"application/json".to_owned()
    );
    assert_eq!(
        headers.get(HEADER_USER_AGENT).expect("user-agent"),
        &"cowrite-test/1.0".to_owned()
    );
    assert_eq!(headers.get("x-extra").expect("extra"), &"value".to_owned());
    assert!(!headers.contains_key("authorization"));
}

#[test]
fn header_blank_user_agent_uses_default() {
    let config = GeminiApiConfig::new("key").with_user_agent("   ");
    let headers = build_headers(&config).expect("header construction");
    assert!(headers
        .get(HEADER_USER_AGENT)
        .expect("user-agent")
        .starts_with("cowrite/"));
}

#[test]
fn header_missing_api_key_is_rejected() {
    let error = build_headers(&GeminiApiConfig::new("   ")).expect_err("blank key must fail");
    assert!(matches!(error, GeminiApiError::MissingApiKey));
}
