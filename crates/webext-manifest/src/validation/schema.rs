//! Schema-level manifest rules for manifest versions 2 and 3.

use serde_json::{Map, Value};

use crate::error::ValidationError;

/// Supported manifest format versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManifestVersion {
    V2,
    V3,
}

impl ManifestVersion {
    /// Returns the numeric version.
    pub fn number(&self) -> u8 {
        match self {
            ManifestVersion::V2 => 2,
            ManifestVersion::V3 => 3,
        }
    }
}

/// Chrome web store limits for displayed strings.
const MAX_NAME_LEN: usize = 75;
const MAX_SHORT_NAME_LEN: usize = 12;
const MAX_DESCRIPTION_LEN: usize = 132;

/// Optional top-level fields that must be strings in every version.
const STRING_FIELDS: &[&str] = &[
    "short_name",
    "description",
    "author",
    "default_locale",
    "homepage_url",
    "minimum_chrome_version",
    "options_page",
    "devtools_page",
    "version_name",
];

const INCOGNITO_VALUES: &[&str] = &["spanning", "split", "not_allowed"];
const RUN_AT_VALUES: &[&str] = &["document_start", "document_end", "document_idle"];
const BACKGROUND_TYPES: &[&str] = &["classic", "module"];

/// Runs every schema rule and returns the collected violations.
pub(super) fn validate_schema(manifest: &Value, version: ManifestVersion) -> Vec<ValidationError> {
    let mut checker = Checker::new(version);

    let Some(root) = manifest.as_object() else {
        checker.violation("", "manifest must be an object");
        return checker.errors;
    };

    checker.required_string(root, "name", "name");
    checker.required_string(root, "version", "version");
    for field in STRING_FIELDS {
        checker.optional_string(root, field, field);
    }
    checker.display_length(root, "name", MAX_NAME_LEN);
    checker.display_length(root, "short_name", MAX_SHORT_NAME_LEN);
    checker.display_length(root, "description", MAX_DESCRIPTION_LEN);

    checker.icons(root.get("icons"), "icons");
    checker.optional_string_array(root, "permissions", "permissions");
    checker.optional_string_array(root, "optional_permissions", "optional_permissions");
    for field in ["host_permissions", "optional_host_permissions"] {
        if root.contains_key(field) {
            checker.version_only(field, ManifestVersion::V3);
            checker.optional_string_array(root, field, field);
        }
    }
    checker.optional_enum(root, "incognito", INCOGNITO_VALUES, "incognito");

    if let Some(background) = root.get("background") {
        checker.background(background);
    }
    if let Some(csp) = root.get("content_security_policy") {
        checker.content_security_policy(csp);
    }
    if let Some(resources) = root.get("web_accessible_resources") {
        checker.web_accessible_resources(resources);
    }

    for field in ["browser_action", "page_action"] {
        if let Some(action) = root.get(field) {
            checker.version_only(field, ManifestVersion::V2);
            checker.action(action, field);
        }
    }
    if let Some(action) = root.get("action") {
        checker.version_only("action", ManifestVersion::V3);
        checker.action(action, "action");
    }

    if let Some(scripts) = root.get("content_scripts") {
        checker.content_scripts(scripts);
    }
    if let Some(options_ui) = root.get("options_ui") {
        checker.options_ui(options_ui);
    }
    if let Some(commands) = root.get("commands") {
        checker.commands(commands);
    }

    checker.errors
}

/// Returns true for `__MSG_name__` localization placeholders.
fn is_message_placeholder(value: &str) -> bool {
    value.starts_with("__MSG_") && value.ends_with("__")
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn join(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", parent, key)
    }
}

struct Checker {
    version: ManifestVersion,
    errors: Vec<ValidationError>,
}

impl Checker {
    fn new(version: ManifestVersion) -> Self {
        Self {
            version,
            errors: Vec::new(),
        }
    }

    fn violation(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationError::schema(path, message));
    }

    fn wrong_type(&mut self, path: &str, expected: &str, value: &Value) {
        self.violation(
            path,
            format!("should be {}, got {}", expected, type_name(value)),
        );
    }

    fn version_only(&mut self, field: &str, required: ManifestVersion) {
        if self.version != required {
            self.violation(
                field,
                format!(
                    "{} requires manifest_version {}, got {}",
                    field,
                    required.number(),
                    self.version.number()
                ),
            );
        }
    }

    fn required_string(&mut self, obj: &Map<String, Value>, key: &str, path: &str) {
        match obj.get(key) {
            None => self.violation(path, format!("{} is required", key)),
            Some(value) => self.string(value, path),
        }
    }

    fn optional_string(&mut self, obj: &Map<String, Value>, key: &str, path: &str) {
        if let Some(value) = obj.get(key) {
            self.string(value, path);
        }
    }

    fn string(&mut self, value: &Value, path: &str) {
        if !value.is_string() {
            self.wrong_type(path, "string", value);
        }
    }

    fn boolean(&mut self, obj: &Map<String, Value>, key: &str, path: &str) {
        if let Some(value) = obj.get(key) {
            if !value.is_boolean() {
                self.wrong_type(path, "boolean", value);
            }
        }
    }

    fn string_array(&mut self, value: &Value, path: &str) {
        let Some(items) = value.as_array() else {
            self.wrong_type(path, "array", value);
            return;
        };
        for (i, item) in items.iter().enumerate() {
            self.string(item, &format!("{}[{}]", path, i));
        }
    }

    fn optional_string_array(&mut self, obj: &Map<String, Value>, key: &str, path: &str) {
        if let Some(value) = obj.get(key) {
            self.string_array(value, path);
        }
    }

    fn optional_enum(&mut self, obj: &Map<String, Value>, key: &str, allowed: &[&str], path: &str) {
        let Some(value) = obj.get(key) else {
            return;
        };
        match value.as_str() {
            Some(s) if allowed.contains(&s) => {}
            Some(s) => self.violation(
                path,
                format!("should be one of {}, got '{}'", allowed.join(", "), s),
            ),
            None => self.wrong_type(path, "string", value),
        }
    }

    fn display_length(&mut self, obj: &Map<String, Value>, key: &str, max: usize) {
        let Some(text) = obj.get(key).and_then(Value::as_str) else {
            return;
        };
        if !is_message_placeholder(text) && text.chars().count() > max {
            self.violation(
                key,
                format!("should not be longer than {} characters", max),
            );
        }
    }

    fn object<'v>(&mut self, value: &'v Value, path: &str) -> Option<&'v Map<String, Value>> {
        let obj = value.as_object();
        if obj.is_none() {
            self.wrong_type(path, "object", value);
        }
        obj
    }

    fn icons(&mut self, value: Option<&Value>, path: &str) {
        let Some(value) = value else {
            return;
        };
        let Some(icons) = self.object(value, path) else {
            return;
        };
        for (size, icon) in icons {
            let icon_path = join(path, size);
            if size.parse::<u32>().map_or(true, |n| n == 0) {
                self.violation(
                    icon_path.clone(),
                    format!("icon size should be a positive integer, got '{}'", size),
                );
            }
            self.string(icon, &icon_path);
        }
    }

    fn background(&mut self, value: &Value) {
        let Some(background) = self.object(value, "background") else {
            return;
        };

        self.optional_string(background, "page", "background.page");
        self.optional_string_array(background, "scripts", "background.scripts");
        self.boolean(background, "persistent", "background.persistent");

        if background.contains_key("page") && background.contains_key("scripts") {
            self.violation(
                "background",
                "background.page and background.scripts cannot both be present",
            );
        }

        match self.version {
            ManifestVersion::V2 => {
                if background.contains_key("service_worker") {
                    self.violation(
                        "background.service_worker",
                        "service_worker requires manifest_version 3",
                    );
                }
            }
            ManifestVersion::V3 => {
                self.optional_string(background, "service_worker", "background.service_worker");
                self.optional_enum(background, "type", BACKGROUND_TYPES, "background.type");
                if background.get("persistent") == Some(&Value::Bool(true)) {
                    self.violation(
                        "background.persistent",
                        "persistent background pages are not supported in manifest_version 3",
                    );
                }
            }
        }
    }

    fn content_security_policy(&mut self, value: &Value) {
        let path = "content_security_policy";
        match self.version {
            ManifestVersion::V2 => self.string(value, path),
            ManifestVersion::V3 => {
                let Some(csp) = self.object(value, path) else {
                    return;
                };
                self.optional_string(csp, "extension_pages", "content_security_policy.extension_pages");
                self.optional_string(csp, "sandbox", "content_security_policy.sandbox");
            }
        }
    }

    fn web_accessible_resources(&mut self, value: &Value) {
        let path = "web_accessible_resources";
        let Some(entries) = value.as_array() else {
            self.wrong_type(path, "array", value);
            return;
        };

        for (i, entry) in entries.iter().enumerate() {
            let entry_path = format!("{}[{}]", path, i);
            match self.version {
                ManifestVersion::V2 => self.string(entry, &entry_path),
                ManifestVersion::V3 => {
                    let Some(obj) = self.object(entry, &entry_path) else {
                        continue;
                    };
                    match obj.get("resources") {
                        None => self.violation(
                            join(&entry_path, "resources"),
                            "resources is required",
                        ),
                        Some(resources) => {
                            self.string_array(resources, &join(&entry_path, "resources"))
                        }
                    }
                    self.optional_string_array(obj, "matches", &join(&entry_path, "matches"));
                    self.optional_string_array(
                        obj,
                        "extension_ids",
                        &join(&entry_path, "extension_ids"),
                    );
                    self.boolean(obj, "use_dynamic_url", &join(&entry_path, "use_dynamic_url"));
                }
            }
        }
    }

    fn action(&mut self, value: &Value, path: &str) {
        let Some(action) = self.object(value, path) else {
            return;
        };
        self.optional_string(action, "default_title", &join(path, "default_title"));
        self.optional_string(action, "default_popup", &join(path, "default_popup"));
        if let Some(icon) = action.get("default_icon") {
            let icon_path = join(path, "default_icon");
            if icon.is_object() {
                self.icons(Some(icon), &icon_path);
            } else {
                self.string(icon, &icon_path);
            }
        }
    }

    fn content_scripts(&mut self, value: &Value) {
        let path = "content_scripts";
        let Some(scripts) = value.as_array() else {
            self.wrong_type(path, "array", value);
            return;
        };

        for (i, script) in scripts.iter().enumerate() {
            let script_path = format!("{}[{}]", path, i);
            let Some(obj) = self.object(script, &script_path) else {
                continue;
            };
            match obj.get("matches") {
                None => self.violation(join(&script_path, "matches"), "matches is required"),
                Some(matches) => self.string_array(matches, &join(&script_path, "matches")),
            }
            for key in ["js", "css", "exclude_matches"] {
                self.optional_string_array(obj, key, &join(&script_path, key));
            }
            self.optional_enum(obj, "run_at", RUN_AT_VALUES, &join(&script_path, "run_at"));
            self.boolean(obj, "all_frames", &join(&script_path, "all_frames"));
        }
    }

    fn options_ui(&mut self, value: &Value) {
        let Some(options) = self.object(value, "options_ui") else {
            return;
        };
        self.required_string(options, "page", "options_ui.page");
        self.boolean(options, "open_in_tab", "options_ui.open_in_tab");
    }

    fn commands(&mut self, value: &Value) {
        let Some(commands) = self.object(value, "commands") else {
            return;
        };
        for (name, command) in commands {
            self.object(command, &join("commands", name));
        }
    }
}
