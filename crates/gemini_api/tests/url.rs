use gemini_api::generate_content_url;

#[test]
fn url_appends_version_to_bare_host() {
    assert_eq!(
        generate_content_url("https://generativelanguage.googleapis.com", "gemini-2.5-flash"),
        "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
    );
}

#[test]
fn url_keeps_explicit_version_segment() {
    assert_eq!(
        generate_content_url("https://proxy.internal/v1/", "gemini-2.5-pro"),
        "https://proxy.internal/v1/models/gemini-2.5-pro:generateContent"
    );
    assert_eq!(
        generate_content_url("http://127.0.0.1:8080/v1beta", "m"),
        "http://127.0.0.1:8080/v1beta/models/m:generateContent"
    );
}

#[test]
fn url_strips_models_prefix_from_model_id() {
    assert_eq!(
        generate_content_url("http://localhost", "models/gemini-2.5-pro"),
        "http://localhost/v1beta/models/gemini-2.5-pro:generateContent"
    );
}

#[test]
fn url_blank_base_uses_default_host() {
    assert!(generate_content_url("  ", "m")
        .starts_with("https://generativelanguage.googleapis.com/v1beta/"));
}
