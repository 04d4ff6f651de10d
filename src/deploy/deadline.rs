//! Per-call deadlines for a [`RemoteApi`].

use std::time::{Duration, Instant};

use uuid::Uuid;

use super::remote::{
    AppPayload, QueryTemplatePayload, RefKind, RemoteApi, RemoteApp, RemoteError,
    RemoteQueryTemplate, ResourceCreation, ResourcePayload,
};

/// Wraps a remote so that every call finishing after `limit` fails with
/// [`RemoteError::DeadlineExceeded`], whatever it returned.
///
/// A late answer is never acted on: a create that came back late is
/// reported as a timeout, and the next run sees it through lookup.
///
/// The deadline is judged when the inner call returns. A call that blocks
/// is waited out, not abandoned, so the inner remote has to bound its own
/// waits. [`LocalRemote`](super::LocalRemote) gives up on a busy store after
/// the store's busy timeout.
#[derive(Debug, Clone)]
pub struct Deadline<R> {
    inner: R,
    limit: Duration,
}

impl<R> Deadline<R> {
    pub fn new(inner: R, limit: Duration) -> Self {
        Self { inner, limit }
    }

    fn call<T>(&self, op: &str, f: impl FnOnce(&R) -> Result<T, RemoteError>) -> Result<T, RemoteError> {
        let started = Instant::now();
        let result = f(&self.inner);
        let elapsed = started.elapsed();
        tracing::debug!(op, ?elapsed, ok = result.is_ok(), "remote call");
        if elapsed > self.limit {
            tracing::warn!(op, ?elapsed, limit = ?self.limit, "remote call missed its deadline");
            return Err(RemoteError::DeadlineExceeded(self.limit));
        }
        result
    }
}

impl<R: RemoteApi> RemoteApi for Deadline<R> {
    fn app_by_name(&self, name: &str) -> Result<RemoteApp, RemoteError> {
        self.call("app_by_name", |r| r.app_by_name(name))
    }

    fn create_app(&self, payload: &AppPayload) -> Result<Uuid, RemoteError> {
        self.call("create_app", |r| r.create_app(payload))
    }

    fn update_app(&self, id: Uuid, payload: &AppPayload) -> Result<(), RemoteError> {
        self.call("update_app", |r| r.update_app(id, payload))
    }

    fn query_template_by_name(&self, app: Uuid, name: &str) -> Result<RemoteQueryTemplate, RemoteError> {
        self.call("query_template_by_name", |r| r.query_template_by_name(app, name))
    }

    fn create_query_template(&self, app: Uuid, payload: &QueryTemplatePayload) -> Result<Uuid, RemoteError> {
        self.call("create_query_template", |r| r.create_query_template(app, payload))
    }

    fn update_query_template(&self, id: Uuid, payload: &QueryTemplatePayload) -> Result<(), RemoteError> {
        self.call("update_query_template", |r| r.update_query_template(id, payload))
    }

    fn create_resource(&self, payload: &ResourcePayload) -> Result<ResourceCreation, RemoteError> {
        self.call("create_resource", |r| r.create_resource(payload))
    }

    fn resolve(&self, kind: RefKind, name: &str) -> Result<Uuid, RemoteError> {
        self.call("resolve", |r| r.resolve(kind, name))
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    /// Answers every lookup with "not found" after a fixed delay.
    struct Slow(Duration);

    impl RemoteApi for Slow {
        fn app_by_name(&self, _: &str) -> Result<RemoteApp, RemoteError> {
            thread::sleep(self.0);
            Err(RemoteError::NotFound)
        }
        fn create_app(&self, _: &AppPayload) -> Result<Uuid, RemoteError> {
            thread::sleep(self.0);
            Ok(Uuid::nil())
        }
        fn update_app(&self, _: Uuid, _: &AppPayload) -> Result<(), RemoteError> {
            Ok(())
        }
        fn query_template_by_name(&self, _: Uuid, _: &str) -> Result<RemoteQueryTemplate, RemoteError> {
            Err(RemoteError::NotFound)
        }
        fn create_query_template(&self, _: Uuid, _: &QueryTemplatePayload) -> Result<Uuid, RemoteError> {
            Ok(Uuid::nil())
        }
        fn update_query_template(&self, _: Uuid, _: &QueryTemplatePayload) -> Result<(), RemoteError> {
            Ok(())
        }
        fn create_resource(&self, _: &ResourcePayload) -> Result<ResourceCreation, RemoteError> {
            Ok(ResourceCreation::Created(Uuid::nil()))
        }
        fn resolve(&self, _: RefKind, _: &str) -> Result<Uuid, RemoteError> {
            Ok(Uuid::nil())
        }
    }

    #[test]
    fn fast_calls_pass_through() {
        let remote = Deadline::new(Slow(Duration::ZERO), Duration::from_secs(5));
        assert_eq!(remote.app_by_name("crm"), Err(RemoteError::NotFound));
        assert_eq!(remote.resolve(RefKind::Group, "staff"), Ok(Uuid::nil()));
    }

    #[test]
    fn late_calls_time_out_even_when_they_succeeded() {
        let limit = Duration::from_millis(5);
        let remote = Deadline::new(Slow(Duration::from_millis(50)), limit);

        let payload = AppPayload {
            name: "crm".into(),
            title: "Customers".into(),
            slug: "customers".into(),
            description: String::new(),
            groups: vec![],
        };
        let err = remote.create_app(&payload).unwrap_err();
        assert_eq!(err, RemoteError::DeadlineExceeded(limit));
        assert!(err.is_retryable());

        // A late "not found" must not read as absence.
        assert_eq!(
            remote.app_by_name("crm"),
            Err(RemoteError::DeadlineExceeded(limit))
        );
    }

    #[test]
    fn blocking_call_is_waited_out() {
        let delay = Duration::from_millis(30);
        let remote = Deadline::new(Slow(delay), Duration::from_millis(1));

        let started = Instant::now();
        let result = remote.app_by_name("crm");

        assert!(started.elapsed() >= delay);
        assert_eq!(result, Err(RemoteError::DeadlineExceeded(Duration::from_millis(1))));
    }
}
