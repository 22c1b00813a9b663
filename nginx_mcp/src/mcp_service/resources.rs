//! Read-only resources exposed next to the tools.

use rmcp::model::{AnnotateAble, ListResourcesResult, RawResource, Resource};

pub const SETTINGS_URI: &str = "nginx://settings";
pub const CONFIG_URI: &str = "nginx://config";

fn resource(uri: &str, name: &str, description: &str, mime_type: &str) -> Resource {
    let mut raw = RawResource::new(uri, name);
    raw.description = Some(description.to_string());
    raw.mime_type = Some(mime_type.to_string());
    raw.no_annotation()
}

pub fn list_resources() -> ListResourcesResult {
    ListResourcesResult::with_all_items(vec![
        resource(
            SETTINGS_URI,
            "settings",
            "Active server settings: target host and port, compose project, timeouts",
            "application/json",
        ),
        resource(
            CONFIG_URI,
            "config",
            "Effective nginx configuration as printed by `nginx -T`",
            "text/plain",
        ),
    ])
}
