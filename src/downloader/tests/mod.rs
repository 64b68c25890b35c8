use super::test_helpers::*;
use super::*;
use crate::archive::{JsonArchive, MemoryArchive};
use crate::error::TransferError;
use crate::types::{ArchiveKey, BatchResult, SkipReason, TransferOutcome, TransferSpec};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tempfile::tempdir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod batch;
