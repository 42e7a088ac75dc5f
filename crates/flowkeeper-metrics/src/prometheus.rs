//! Prometheus text exposition format.

use std::fmt::Write;

use crate::counters::MetricsSnapshot;

/// Render a counters snapshot into Prometheus text format.
pub fn render_prometheus(s: &MetricsSnapshot) -> String {
    let counters: [(&str, &str, u64); 9] = [
        ("flowkeeper_watcher_ticks_total", "Topic watcher ticks run.", s.watcher_ticks),
        (
            "flowkeeper_watcher_tick_failures_total",
            "Watcher ticks aborted because the topic listing failed.",
            s.watcher_tick_failures,
        ),
        (
            "flowkeeper_topics_provisioned_total",
            "Topics provisioned with an ingest table and pipeline.",
            s.topics_provisioned,
        ),
        (
            "flowkeeper_provision_failures_total",
            "Topic provisioning attempts that failed.",
            s.provision_failures,
        ),
        (
            "flowkeeper_supervisor_sweeps_total",
            "Pipeline supervisor sweeps run.",
            s.supervisor_sweeps,
        ),
        (
            "flowkeeper_supervisor_sweep_failures_total",
            "Supervisor sweeps aborted because the pipeline listing failed.",
            s.supervisor_sweep_failures,
        ),
        (
            "flowkeeper_restarts_attempted_total",
            "Pipeline restarts attempted.",
            s.restarts_attempted,
        ),
        (
            "flowkeeper_restarts_succeeded_total",
            "Pipeline restarts that recreated the pipeline.",
            s.restarts_succeeded,
        ),
        (
            "flowkeeper_restarts_failed_total",
            "Pipeline restarts that failed at any step.",
            s.restarts_failed,
        ),
    ];

    let mut out = String::new();
    for (name, help, value) in counters {
        let _ = writeln!(out, "# HELP {name} {help}");
        let _ = writeln!(out, "# TYPE {name} counter");
        let _ = writeln!(out, "{name} {value}");
    }
    out
}
