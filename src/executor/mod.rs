//! Upstream command executor
//!
//! Turns resolved [`UpstreamParams`] into storage calls, optionally waits for
//! the change to become visible, and prints the result.

use crate::domain::{GlobalParams, Upstream, UpstreamParams};
use crate::error::{StorageError, UpstreamError};
use crate::storage::Storage;
use std::io::Write;
use std::thread;
use std::time::Duration;

pub mod render;

pub use render::{render_describe, render_table};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

pub struct UpstreamExecutor<S, W> {
    store: S,
    out: W,
    poll_interval: Duration,
}

impl<S: Storage, W: Write> UpstreamExecutor<S, W> {
    pub fn new(store: S, out: W) -> Self {
        Self { store, out, poll_interval: DEFAULT_POLL_INTERVAL }
    }

    /// Set the pause between two status polls.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_output(self) -> W {
        self.out
    }

    pub fn run_create(
        &mut self,
        gparams: &GlobalParams,
        params: &UpstreamParams,
    ) -> Result<(), UpstreamError> {
        self.save_upstream(gparams, params, true)
    }

    pub fn run_update(
        &mut self,
        gparams: &GlobalParams,
        params: &UpstreamParams,
    ) -> Result<(), UpstreamError> {
        self.save_upstream(gparams, params, false)
    }

    pub fn run_delete(
        &mut self,
        gparams: &GlobalParams,
        params: &UpstreamParams,
    ) -> Result<(), UpstreamError> {
        if params.name.is_empty() {
            return Err(UpstreamError::MissingName);
        }
        self.store.delete(&params.name)?;

        let name = params.name.as_str();
        let done = self.wait(gparams.wait_secs, |store| match store.get(name) {
            Err(StorageError::NotFound(_)) => Some("deleted".to_string()),
            Err(e) => Some(e.to_string()),
            Ok(_) => None,
        })?;
        self.finish(done, "Upstream deleted")
    }

    pub fn run_get(&mut self, params: &UpstreamParams) -> Result<(), UpstreamError> {
        let upstreams = self.fetch(params)?;
        write!(self.out, "{}", render_table(&upstreams))?;
        Ok(())
    }

    pub fn run_describe(&mut self, params: &UpstreamParams) -> Result<(), UpstreamError> {
        for upstream in self.fetch(params)? {
            match render_describe(&upstream) {
                Ok(json) => writeln!(self.out, "{}", json)?,
                Err(e) => {
                    tracing::warn!("failed to render upstream as JSON: {}", e);
                    writeln!(self.out, "{:?}", upstream)?;
                }
            }
        }
        Ok(())
    }

    fn save_upstream(
        &mut self,
        gparams: &GlobalParams,
        params: &UpstreamParams,
        is_create: bool,
    ) -> Result<(), UpstreamError> {
        if params.name.is_empty() || params.upstream_type.is_empty() {
            return Err(UpstreamError::MissingNameOrType);
        }

        let upstream = params.to_upstream();
        if is_create {
            self.store.create(&upstream)?;
        } else {
            self.store.update(&upstream)?;
        }

        let name = params.name.as_str();
        let done =
            self.wait(gparams.wait_secs, |store| store.get(name).ok().map(|_| "ok".to_string()))?;
        self.finish(done, if is_create { "Upstream created" } else { "Upstream updated" })
    }

    /// All upstreams when no name is given, otherwise the named one.
    fn fetch(&self, params: &UpstreamParams) -> Result<Vec<Upstream>, UpstreamError> {
        if params.name.is_empty() {
            Ok(self.store.list()?)
        } else {
            Ok(vec![self.store.get(&params.name)?])
        }
    }

    /// Poll `probe` up to `wait_secs` times, pausing between attempts.
    ///
    /// Returns `true` when the probe reported a status or no wait was
    /// requested, `false` on timeout.
    fn wait<F>(&mut self, wait_secs: u64, mut probe: F) -> Result<bool, UpstreamError>
    where
        F: FnMut(&S) -> Option<String>,
    {
        if wait_secs == 0 {
            return Ok(true);
        }
        for attempt in 1..=wait_secs {
            if let Some(status) = probe(&self.store) {
                writeln!(self.out, "Upstream Status: {}", status)?;
                return Ok(true);
            }
            tracing::debug!(attempt, wait_secs, "upstream status not available yet");
            thread::sleep(self.poll_interval);
        }
        Ok(false)
    }

    fn finish(&mut self, done: bool, message: &str) -> Result<(), UpstreamError> {
        if done {
            writeln!(self.out, "{}", message)?;
        } else {
            writeln!(self.out, "Wait timeout")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParamValue;
    use crate::storage::MemoryStorage;
    use std::cell::Cell;

    fn executor() -> UpstreamExecutor<MemoryStorage, Vec<u8>> {
        UpstreamExecutor::new(MemoryStorage::new("default"), Vec::new())
            .poll_interval(Duration::from_millis(1))
    }

    fn output(executor: UpstreamExecutor<MemoryStorage, Vec<u8>>) -> String {
        String::from_utf8(executor.into_output()).expect("utf8 output")
    }

    fn params(name: &str, upstream_type: &str) -> UpstreamParams {
        UpstreamParams { name: name.into(), upstream_type: upstream_type.into(), ..Default::default() }
    }

    fn waiting(wait_secs: u64) -> GlobalParams {
        GlobalParams { wait_secs, ..Default::default() }
    }

    #[test]
    fn create_requires_name_and_type() {
        let mut exec = executor();
        let err = exec.run_create(&waiting(0), &params("orders", "")).expect_err("missing type");
        assert_eq!(err.to_string(), "Both Name and Type of the Upstream must be provided");
        assert!(matches!(
            exec.run_update(&waiting(0), &params("", "aws")),
            Err(UpstreamError::MissingNameOrType)
        ));
    }

    #[test]
    fn create_stores_resolved_spec() {
        let mut exec = executor();
        let mut p = params("orders", "kubernetes");
        p.spec.insert("serviceport".into(), ParamValue::Int(8080));

        exec.run_create(&waiting(0), &p).expect("create");
        let stored = exec.store().get("orders").expect("stored");
        assert_eq!(stored.spec["serviceport"], serde_json::json!(8080));
        assert_eq!(output(exec), "Upstream created\n");
    }

    #[test]
    fn create_with_wait_reports_status() {
        let mut exec = executor();
        exec.run_create(&waiting(3), &params("orders", "aws")).expect("create");
        assert_eq!(output(exec), "Upstream Status: ok\nUpstream created\n");
    }

    #[test]
    fn update_of_missing_upstream_is_a_storage_error() {
        let mut exec = executor();
        let err = exec.run_update(&waiting(0), &params("orders", "aws")).expect_err("missing");
        assert!(matches!(err, UpstreamError::Storage(StorageError::NotFound(_))));
    }

    #[test]
    fn delete_without_wait_confirms_immediately() {
        let mut exec = executor();
        exec.store().create(&Upstream::new("orders", "aws")).expect("seed");

        exec.run_delete(&waiting(0), &params("orders", "")).expect("delete");
        assert_eq!(output(exec), "Upstream deleted\n");
    }

    #[test]
    fn delete_requires_name() {
        let mut exec = executor();
        assert!(matches!(
            exec.run_delete(&waiting(0), &params("", "aws")),
            Err(UpstreamError::MissingName)
        ));
    }

    #[test]
    fn delete_with_wait_reports_status() {
        let mut exec = executor();
        exec.store().create(&Upstream::new("orders", "aws")).expect("seed");
        exec.run_delete(&waiting(2), &params("orders", "")).expect("delete");
        assert_eq!(output(exec), "Upstream Status: deleted\nUpstream deleted\n");
    }

    #[test]
    fn wait_times_out_after_budget() {
        let mut exec = executor();
        let calls = Cell::new(0);
        let done = exec
            .wait(3, |_| {
                calls.set(calls.get() + 1);
                None
            })
            .expect("wait");

        assert!(!done);
        assert_eq!(calls.get(), 3);
        exec.finish(done, "Upstream created").expect("finish");
        assert_eq!(output(exec), "Wait timeout\n");
    }

    #[test]
    fn zero_wait_never_polls() {
        let mut exec = executor();
        let calls = Cell::new(0);
        let done = exec
            .wait(0, |_| {
                calls.set(calls.get() + 1);
                None
            })
            .expect("wait");
        assert!(done);
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn get_lists_or_fetches_by_name() {
        let mut exec = executor();
        exec.store().create(&Upstream::new("orders", "kubernetes")).expect("seed");
        exec.store().create(&Upstream::new("billing", "aws")).expect("seed");

        exec.run_get(&params("", "")).expect("list");
        exec.run_get(&params("orders", "")).expect("get");
        let out = output(exec);
        assert!(out.starts_with("\n NAME    | TYPE\n billing | aws\n orders  | kubernetes\n"));
        assert!(out.ends_with("\n NAME   | TYPE\n orders | kubernetes\n"));
    }

    #[test]
    fn describe_prints_json_and_fails_on_missing() {
        let mut exec = executor();
        exec.store().create(&Upstream::new("orders", "kubernetes")).expect("seed");

        exec.run_describe(&params("orders", "")).expect("describe");
        assert!(matches!(
            exec.run_describe(&params("missing", "")),
            Err(UpstreamError::Storage(StorageError::NotFound(_)))
        ));
        let out = output(exec);
        assert!(out.contains("\"type\": \"kubernetes\""));
        assert!(out.contains("\"resource_version\": 1"));
    }
}
