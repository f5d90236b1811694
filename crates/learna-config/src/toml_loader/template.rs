//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# Learna client configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.
# LEARNA_BACKEND_URL and LEARNA_MODELS (comma-separated) override this file.

[gateway]
base_url = "http://localhost:5000/"

[chat]
models = ["openai/gpt-oss-20b"]
default_agent = "tutor"
# upload_all_attachments = false   # only the first attached file is uploaded

[timeouts]
# connect_secs = 10        # 1-120
# request_secs = 60        # 1-600, until response headers arrive
# chunk_idle_secs = 120    # 1-3600, max silence inside a streamed reply

[logging]
# level = "info"           # trace, debug, info, warn, error
"##
    .to_string()
}
