//! Job termination status codes.
//!
//! Bareos records the outcome of every job as a single character in the
//! `JobStatus` column. The set is fixed and ordered; it is used to expand the
//! last status of a client into one sample per code.

use std::fmt;

/// Termination status of a Bareos job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminationStatus {
    Created,
    Running,
    Blocked,
    Terminated,
    ErrorTerminated,
    NonFatalError,
    FatalError,
    Differences,
    Canceled,
    Incomplete,
    Committing,
    Warnings,
    DataDespooling,
    Queued,
    WaitOnFd,
    WaitOnSd,
    WaitNewMedia,
    WaitMount,
    WaitStorageResource,
    WaitJobResource,
    WaitClientResource,
    WaitMaxJobs,
    WaitStartTime,
    WaitPriority,
    BatchInsert,
    AttrDespooling,
}

use TerminationStatus::*;

impl TerminationStatus {
    /// Every status, in exposition order.
    pub const ALL: [TerminationStatus; 26] = [
        Created,
        Running,
        Blocked,
        Terminated,
        ErrorTerminated,
        NonFatalError,
        FatalError,
        Differences,
        Canceled,
        Incomplete,
        Committing,
        Warnings,
        DataDespooling,
        Queued,
        WaitOnFd,
        WaitOnSd,
        WaitNewMedia,
        WaitMount,
        WaitStorageResource,
        WaitJobResource,
        WaitClientResource,
        WaitMaxJobs,
        WaitStartTime,
        WaitPriority,
        BatchInsert,
        AttrDespooling,
    ];

    /// Statuses whose jobs count as saved data.
    pub const SUCCESSFUL: [TerminationStatus; 2] = [Terminated, Warnings];

    /// Catalog code for this status.
    pub const fn code(self) -> char {
        match self {
            Created => 'C',
            Running => 'R',
            Blocked => 'B',
            Terminated => 'T',
            ErrorTerminated => 'E',
            NonFatalError => 'e',
            FatalError => 'f',
            Differences => 'D',
            Canceled => 'A',
            Incomplete => 'I',
            Committing => 'L',
            Warnings => 'W',
            DataDespooling => 'l',
            Queued => 'q',
            WaitOnFd => 'F',
            WaitOnSd => 'S',
            WaitNewMedia => 'm',
            WaitMount => 'M',
            WaitStorageResource => 's',
            WaitJobResource => 'j',
            WaitClientResource => 'c',
            WaitMaxJobs => 'd',
            WaitStartTime => 't',
            WaitPriority => 'p',
            BatchInsert => 'i',
            AttrDespooling => 'a',
        }
    }

    /// Code as a label value.
    pub fn label(self) -> &'static str {
        // Indexed to avoid allocating a String per sample.
        const LABELS: [&str; 26] = [
            "C", "R", "B", "T", "E", "e", "f", "D", "A", "I", "L", "W", "l", "q", "F", "S", "m",
            "M", "s", "j", "c", "d", "t", "p", "i", "a",
        ];
        LABELS[self as usize]
    }

    pub fn from_code(code: char) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }

    pub fn description(self) -> &'static str {
        match self {
            Created => "Created, not yet running",
            Running => "Running",
            Blocked => "Blocked",
            Terminated => "Terminated normally",
            ErrorTerminated => "Terminated in error",
            NonFatalError => "Non-fatal error",
            FatalError => "Fatal error",
            Differences => "Verify found differences",
            Canceled => "Canceled by user",
            Incomplete => "Incomplete job",
            Committing => "Committing data",
            Warnings => "Terminated with warnings",
            DataDespooling => "Doing data despooling",
            Queued => "Queued waiting for device",
            WaitOnFd => "Waiting for file daemon",
            WaitOnSd => "Waiting for storage daemon",
            WaitNewMedia => "Waiting for new media",
            WaitMount => "Waiting for media mount",
            WaitStorageResource => "Waiting for storage resource",
            WaitJobResource => "Waiting for job resource",
            WaitClientResource => "Waiting for client resource",
            WaitMaxJobs => "Waiting on maximum jobs",
            WaitStartTime => "Waiting on start time",
            WaitPriority => "Waiting on higher priority jobs",
            BatchInsert => "Doing batch insert of file records",
            AttrDespooling => "Despooling attributes",
        }
    }

    pub fn is_successful(self) -> bool {
        Self::SUCCESSFUL.contains(&self)
    }
}

impl fmt::Display for TerminationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
