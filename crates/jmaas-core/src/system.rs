use std::sync::OnceLock;

static INSTANCE_ID: OnceLock<String> = OnceLock::new();

/// Env variable overriding the instance id.
pub const INSTANCE_ID_ENV: &str = "JMAAS_INSTANCE_ID";

/// Identity of this process, mixed into job names.
///
/// Resolved once: `JMAAS_INSTANCE_ID` if set, else the host name, else a random UUID.
pub fn instance_id() -> &'static str {
    INSTANCE_ID.get_or_init(|| {
        if let Ok(id) = std::env::var(INSTANCE_ID_ENV)
            && !id.trim().is_empty()
        {
            return id.trim().to_string();
        }
        if let Ok(hostname) = hostname::get()
            && let Some(name) = hostname.to_str()
            && !name.is_empty()
        {
            return name.to_string();
        }
        uuid::Uuid::new_v4().to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_id_is_stable() {
        let a = instance_id();
        let b = instance_id();
        assert_eq!(a, b);
        assert!(!a.is_empty());
    }
}
