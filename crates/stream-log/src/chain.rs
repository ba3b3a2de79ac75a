// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use parking_lot::Mutex;

use crate::record::RecordId;

/// Links consecutive records written through one logger.
///
/// Best effort only: the value lives in memory, is not shared between
/// processes, and two concurrent writers on the same logger can both read
/// the same parent before either records its own id.
#[derive(Debug, Default)]
pub struct SessionChain {
	previous: Mutex<Option<RecordId>>,
}

impl SessionChain {
	pub fn new() -> Self {
		Self::default()
	}

	/// Parent for the next record.
	pub fn parent(&self) -> Option<RecordId> {
		*self.previous.lock()
	}

	/// Records `id` as the most recent write.
	pub fn advance(&self, id: RecordId) {
		*self.previous.lock() = Some(id);
	}
}
