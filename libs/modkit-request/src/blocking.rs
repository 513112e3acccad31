//! Shared runtime backing the blocking entry points.

use crate::error::HttpError;
use std::future::Future;
use std::sync::OnceLock;
use tokio::runtime::{Builder, Handle, Runtime};

static RUNTIME: OnceLock<Runtime> = OnceLock::new();

fn runtime() -> Result<&'static Runtime, HttpError> {
    if let Some(runtime) = RUNTIME.get() {
        return Ok(runtime);
    }
    let runtime = Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("modkit-request-blocking")
        .enable_all()
        .build()
        .map_err(HttpError::Runtime)?;
    // A concurrent caller may have won the race; its runtime is kept and ours dropped.
    Ok(RUNTIME.get_or_init(|| runtime))
}

/// Drive `future` to completion from synchronous code
///
/// # Errors
/// Returns `HttpError::BlockingInAsyncContext` when called from inside a Tokio
/// runtime, `HttpError::Runtime` if the shared runtime cannot start, or the
/// error produced by `future`.
pub(crate) fn block_on<F, T>(future: F) -> Result<T, HttpError>
where
    F: Future<Output = Result<T, HttpError>>,
{
    if Handle::try_current().is_ok() {
        return Err(HttpError::BlockingInAsyncContext);
    }
    runtime()?.block_on(future)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_block_on_runs_future() {
        let value = block_on(async { Ok::<_, HttpError>(42) }).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_runtime_is_shared() {
        let a = runtime().unwrap();
        let b = runtime().unwrap();
        assert!(std::ptr::eq(a, b));
    }

    #[tokio::test]
    async fn test_block_on_inside_runtime_fails_fast() {
        let result = block_on(async { Ok::<_, HttpError>(()) });
        assert!(matches!(result, Err(HttpError::BlockingInAsyncContext)));
    }
}
