use serde_json::{Map, Value};

use crate::core::errors::ApiError;

pub fn validate_config(config: &Value) -> Result<(), ApiError> {
    let root = config
        .as_object()
        .ok_or_else(|| config_type_error("root", "object"))?;

    if let Some(server) = expect_optional_object(root, "server")? {
        validate_optional_string_field(server, "server.host", "host")?;
        validate_u64_field(server, "server.port", "port", 0, 65535)?;
        validate_string_array_field(
            server,
            "server.cors_allowed_origins",
            "cors_allowed_origins",
        )?;
    }

    if let Some(storage) = expect_optional_object(root, "storage")? {
        validate_optional_string_field(storage, "storage.index_dir", "index_dir")?;
    }

    if let Some(embedding) = expect_optional_object(root, "embedding")? {
        if let Some(provider) = embedding.get("provider") {
            match provider.as_str() {
                Some("openai") | Some("hashing") => {}
                _ => {
                    return Err(ApiError::BadRequest(
                        "Invalid config at 'embedding.provider': expected 'openai' or 'hashing'"
                            .to_string(),
                    ))
                }
            }
        }
        validate_optional_string_field(embedding, "embedding.base_url", "base_url")?;
        validate_optional_string_field(embedding, "embedding.model", "model")?;
        validate_u64_field(
            embedding,
            "embedding.timeout_secs",
            "timeout_secs",
            1,
            86_400,
        )?;
        validate_u64_field(embedding, "embedding.batch_size", "batch_size", 1, 2_048)?;
        validate_u64_field(embedding, "embedding.dimensions", "dimensions", 1, 65_536)?;
    }

    if let Some(chunking) = expect_optional_object(root, "chunking")? {
        validate_u64_field(chunking, "chunking.max_words", "max_words", 1, 100_000)?;
    }

    if let Some(search) = expect_optional_object(root, "search")? {
        validate_u64_field(search, "search.default_k", "default_k", 1, 1_000)?;
        validate_u64_field(
            search,
            "search.max_context_length",
            "max_context_length",
            1,
            1_000_000,
        )?;
        validate_bool_field(search, "search.include_citations", "include_citations")?;
    }

    if let Some(flags) = expect_optional_object(root, "flags")? {
        validate_string_array_field(flags, "flags.keywords", "keywords")?;
    }

    if let Some(scheduler) = expect_optional_object(root, "scheduler")? {
        validate_bool_field(scheduler, "scheduler.autostart", "autostart")?;
        if let Some(jobs) = scheduler.get("jobs") {
            let items = jobs
                .as_array()
                .ok_or_else(|| config_type_error("scheduler.jobs", "array"))?;
            for (index, item) in items.iter().enumerate() {
                let path_prefix = format!("scheduler.jobs[{}]", index);
                let entry = item
                    .as_object()
                    .ok_or_else(|| config_type_error(&path_prefix, "object"))?;
                validate_required_string_field(entry, &format!("{}.id", path_prefix), "id")?;
                validate_u64_field(
                    entry,
                    &format!("{}.interval_minutes", path_prefix),
                    "interval_minutes",
                    1,
                    525_600,
                )?;
                validate_u64_field(
                    entry,
                    &format!("{}.days_back", path_prefix),
                    "days_back",
                    1,
                    3_650,
                )?;
                let source = entry
                    .get("source")
                    .and_then(|v| v.as_object())
                    .ok_or_else(|| config_type_error(&format!("{}.source", path_prefix), "object"))?;
                validate_required_string_field(
                    source,
                    &format!("{}.source.kind", path_prefix),
                    "kind",
                )?;
            }
        }
    }

    Ok(())
}

fn expect_optional_object<'a>(
    root: &'a Map<String, Value>,
    key: &str,
) -> Result<Option<&'a Map<String, Value>>, ApiError> {
    match root.get(key) {
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(_) => Err(config_type_error(key, "object")),
        None => Ok(None),
    }
}

fn validate_bool_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.as_bool().is_some() {
        return Ok(());
    }
    Err(config_type_error(path, "boolean"))
}

fn validate_u64_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
    min: u64,
    max: u64,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(number) = value.as_u64() else {
        return Err(config_type_error(path, "integer"));
    };
    if number < min || number > max {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': must be between {} and {}",
            path, min, max
        )));
    }
    Ok(())
}

fn validate_required_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let value = section.get(key).ok_or_else(|| {
        ApiError::BadRequest(format!("Invalid config at '{}': value is required", path))
    })?;
    let Some(text) = value.as_str() else {
        return Err(config_type_error(path, "string"));
    };
    if text.trim().is_empty() {
        return Err(ApiError::BadRequest(format!(
            "Invalid config at '{}': value cannot be empty",
            path
        )));
    }
    Ok(())
}

fn validate_optional_string_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    if value.is_null() || value.as_str().is_some() {
        return Ok(());
    }
    Err(config_type_error(path, "string"))
}

fn validate_string_array_field(
    section: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<(), ApiError> {
    let Some(value) = section.get(key) else {
        return Ok(());
    };
    let Some(items) = value.as_array() else {
        return Err(config_type_error(path, "array of strings"));
    };
    for (index, item) in items.iter().enumerate() {
        let Some(text) = item.as_str() else {
            return Err(config_type_error(&format!("{}[{}]", path, index), "string"));
        };
        if text.trim().is_empty() {
            return Err(ApiError::BadRequest(format!(
                "Invalid config at '{}[{}]': value cannot be empty",
                path, index
            )));
        }
    }
    Ok(())
}

fn config_type_error(path: &str, expected: &str) -> ApiError {
    ApiError::BadRequest(format!(
        "Invalid config at '{}': expected {}",
        path, expected
    ))
}
