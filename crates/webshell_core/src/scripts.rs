//! crates/webshell_core/src/scripts.rs
//!
//! Builds the snippets injected into the embedded surface to mirror the
//! session into its `localStorage`. Every value is embedded as a JSON string
//! literal so quotes or backslashes in a token or user cannot escape it.

use serde_json::Value as JsonValue;

use crate::domain::{User, STORAGE_KEY_TOKEN, STORAGE_KEY_USER};

fn js_string(value: &str) -> String {
    JsonValue::String(value.to_owned()).to_string()
}

fn guarded(statements: &str, what: &str) -> String {
    format!(
        "try {{\n{statements}\n}} catch (e) {{\n  console.error({}, e);\n}}\ntrue;",
        js_string(&format!("Failed to update {what}:"))
    )
}

fn set_item(key: &str, value: &str) -> String {
    format!("  localStorage.setItem({}, {});", js_string(key), js_string(value))
}

fn remove_item(key: &str) -> String {
    format!("  localStorage.removeItem({});", js_string(key))
}

pub fn user_json(user: &User) -> String {
    serde_json::to_string(user).unwrap_or_else(|_| "{}".to_string())
}

pub fn store_token(token: &str) -> String {
    guarded(&set_item(STORAGE_KEY_TOKEN, token), STORAGE_KEY_TOKEN)
}

pub fn store_user(user: &User) -> String {
    guarded(&set_item(STORAGE_KEY_USER, &user_json(user)), STORAGE_KEY_USER)
}

/// Writes `{}` so the page can tell "asked, nobody signed in" from "never asked".
pub fn store_empty_user() -> String {
    guarded(&set_item(STORAGE_KEY_USER, "{}"), STORAGE_KEY_USER)
}

pub fn store_login(token: &str, user: &User) -> String {
    let statements = format!(
        "{}\n{}",
        set_item(STORAGE_KEY_TOKEN, token),
        set_item(STORAGE_KEY_USER, &user_json(user))
    );
    guarded(&statements, "session")
}

pub fn remove_token() -> String {
    guarded(&remove_item(STORAGE_KEY_TOKEN), STORAGE_KEY_TOKEN)
}

pub fn clear_auth() -> String {
    let statements = format!(
        "{}\n{}",
        remove_item(STORAGE_KEY_TOKEN),
        remove_item(STORAGE_KEY_USER)
    );
    guarded(&statements, "session")
}
