//! Declarations of every metric the exporter exposes.
//!
//! The registry is built once at startup and shared by the collector, which
//! fills samples against it, and the metrics sink, which turns each entry
//! into a Prometheus vector.

/// Identifies one exposed metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricId {
    FilesSaved,
    BytesSaved,
    LastJobBytes,
    LastJobFiles,
    LastJobErrors,
    LastJobTimestamp,
    LastJobStatus,
    LastFullJobBytes,
    LastFullJobFiles,
    LastFullJobErrors,
    LastFullJobTimestamp,
    ScheduledJobs,
}

/// Prometheus type a metric is exposed as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
}

/// Name, help text and label dimensions of a metric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDescriptor {
    pub id: MetricId,
    pub name: &'static str,
    pub help: &'static str,
    pub labels: &'static [&'static str],
    pub kind: MetricKind,
}

pub const CLIENT_LABEL: &str = "client";
pub const LEVEL_LABEL: &str = "level";
pub const STATUS_LABEL: &str = "status";

const CLIENT: &[&str] = &[CLIENT_LABEL];
const CLIENT_LEVEL: &[&str] = &[CLIENT_LABEL, LEVEL_LABEL];
const CLIENT_STATUS: &[&str] = &[CLIENT_LABEL, STATUS_LABEL];

const fn descriptor(
    id: MetricId,
    name: &'static str,
    help: &'static str,
    labels: &'static [&'static str],
    kind: MetricKind,
) -> MetricDescriptor {
    MetricDescriptor {
        id,
        name,
        help,
        labels,
        kind,
    }
}

/// Immutable table of metric descriptors, in exposition order.
#[derive(Debug, Clone)]
pub struct DescriptorRegistry {
    descriptors: Vec<MetricDescriptor>,
}

impl DescriptorRegistry {
    pub fn new() -> Self {
        use MetricId::*;
        use MetricKind::*;

        let descriptors = vec![
            descriptor(
                FilesSaved,
                "files_saved_total",
                "Total files saved for a client during all successful backups combined",
                CLIENT,
                Counter,
            ),
            descriptor(
                BytesSaved,
                "bytes_saved_total",
                "Total bytes saved for a client during all successful backups combined",
                CLIENT,
                Counter,
            ),
            descriptor(
                LastJobBytes,
                "last_backup_job_bytes_saved_total",
                "Total bytes saved during the last successful backup of a client",
                CLIENT_LEVEL,
                Counter,
            ),
            descriptor(
                LastJobFiles,
                "last_backup_job_files_saved_total",
                "Total files saved during the last successful backup of a client",
                CLIENT_LEVEL,
                Counter,
            ),
            descriptor(
                LastJobErrors,
                "last_backup_job_errors_total",
                "Errors occurred during the last successful backup of a client",
                CLIENT_LEVEL,
                Counter,
            ),
            descriptor(
                LastJobTimestamp,
                "last_backup_job_timestamp",
                "Start time of the last successful backup of a client, in seconds since the epoch",
                CLIENT_LEVEL,
                Gauge,
            ),
            descriptor(
                LastJobStatus,
                "last_backup_job_status",
                "Termination status of the last attempted job of a client (1 for the current status)",
                CLIENT_STATUS,
                Gauge,
            ),
            descriptor(
                LastFullJobBytes,
                "last_full_backup_job_bytes_saved_total",
                "Total bytes saved during the last successful full backup (Level = F) of a client",
                CLIENT,
                Counter,
            ),
            descriptor(
                LastFullJobFiles,
                "last_full_backup_job_files_saved_total",
                "Total files saved during the last successful full backup (Level = F) of a client",
                CLIENT,
                Counter,
            ),
            descriptor(
                LastFullJobErrors,
                "last_full_backup_job_errors_total",
                "Errors occurred during the last successful full backup (Level = F) of a client",
                CLIENT,
                Counter,
            ),
            descriptor(
                LastFullJobTimestamp,
                "last_full_backup_job_timestamp",
                "Start time of the last successful full backup of a client, in seconds since the epoch",
                CLIENT,
                Gauge,
            ),
            descriptor(
                ScheduledJobs,
                "scheduled_jobs_total",
                "Jobs of a client scheduled for the current day",
                CLIENT,
                Counter,
            ),
        ];

        Self { descriptors }
    }

    pub fn get(&self, id: MetricId) -> &MetricDescriptor {
        // Descriptors are declared in `MetricId` order.
        &self.descriptors[id as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetricDescriptor> {
        self.descriptors.iter()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

impl Default for DescriptorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_registry_declares_twelve_metrics() {
        let registry = DescriptorRegistry::new();
        assert_eq!(registry.len(), 12);

        let names: HashSet<&str> = registry.iter().map(|d| d.name).collect();
        assert_eq!(names.len(), 12);
    }

    #[test]
    fn test_label_dimensions() {
        let registry = DescriptorRegistry::new();
        assert_eq!(registry.get(MetricId::BytesSaved).labels, &["client"]);
        assert_eq!(
            registry.get(MetricId::LastJobBytes).labels,
            &["client", "level"]
        );
        assert_eq!(
            registry.get(MetricId::LastJobStatus).labels,
            &["client", "status"]
        );
        assert_eq!(
            registry.get(MetricId::LastFullJobTimestamp).labels,
            &["client"]
        );
    }

    #[test]
    fn test_every_id_resolves() {
        let registry = DescriptorRegistry::new();
        for descriptor in registry.iter() {
            assert_eq!(registry.get(descriptor.id), descriptor);
        }
    }

    #[test]
    fn test_total_suffix_is_counter() {
        let registry = DescriptorRegistry::new();
        for descriptor in registry.iter() {
            let is_total = descriptor.name.ends_with("_total");
            assert_eq!(is_total, descriptor.kind == MetricKind::Counter, "{}", descriptor.name);
        }
    }
}
