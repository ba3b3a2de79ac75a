// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Ordered extension points.
//!
//! Components that allow outside code to adjust a value (the tenant id a
//! record is logged under, the record itself, the list-table columns and
//! filters) own a [`Transforms`] list and run it at one fixed point.
//! Transforms run in registration order, each receiving the previous one's
//! output.

use std::fmt;
use std::sync::Arc;

pub type Transform<T> = Arc<dyn Fn(T) -> T + Send + Sync>;

pub struct Transforms<T> {
	list: Vec<Transform<T>>,
}

impl<T> Transforms<T> {
	pub fn new() -> Self {
		Self { list: Vec::new() }
	}

	pub fn register<F>(&mut self, transform: F)
	where
		F: Fn(T) -> T + Send + Sync + 'static,
	{
		self.list.push(Arc::new(transform));
	}

	pub fn apply(&self, input: T) -> T {
		self.list.iter().fold(input, |value, transform| transform(value))
	}

	pub fn len(&self) -> usize {
		self.list.len()
	}

	pub fn is_empty(&self) -> bool {
		self.list.is_empty()
	}
}

impl<T> Default for Transforms<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T> Clone for Transforms<T> {
	fn clone(&self) -> Self {
		Self {
			list: self.list.clone(),
		}
	}
}

impl<T> fmt::Debug for Transforms<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Transforms")
			.field("len", &self.list.len())
			.finish()
	}
}
