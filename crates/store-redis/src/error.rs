use jobstatus_store::StoreError;

#[allow(clippy::needless_pass_by_value)] // signature required for use with .map_err()
pub(crate) fn map_redis_err(e: redis::RedisError) -> StoreError {
    use redis::ErrorKind;
    match e.kind() {
        ErrorKind::IoError | ErrorKind::AuthenticationFailed => {
            StoreError::Connection(e.to_string())
        }
        ErrorKind::TypeError => StoreError::Other(format!("redis type error: {e}")),
        _ => StoreError::Other(e.to_string()),
    }
}
