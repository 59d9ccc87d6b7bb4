//! Core types for batchfetch

use serde::{Deserialize, Serialize};

/// Identifier of a worker in the pool (1-based)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerId(pub usize);

impl WorkerId {
    /// Get the inner value
    pub fn get(&self) -> usize {
        self.0
    }
}

impl From<usize> for WorkerId {
    fn from(id: usize) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for WorkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Primary resource payload
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Resource identifier
    pub id: i64,
    /// Title
    pub title: String,
    /// Body text
    pub body: String,
    /// Dependent entries, attached only when the dependent fetch succeeded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<Comment>>,
}

/// Entry of the dependent resource list
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Identifier of the post this entry belongs to
    #[serde(rename = "postId")]
    pub post_id: i64,
    /// Entry identifier
    pub id: i64,
    /// Author name
    pub name: String,
    /// Author email
    pub email: String,
    /// Body text
    pub body: String,
}

/// One target of a batch run and the outcome of fetching it.
///
/// The address never changes after construction. The outcome fields are private
/// so that `succeeded` and `post` can only be set together: a descriptor reports
/// success if and only if it carries a post.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResourceDescriptor {
    address: String,
    succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    post: Option<Post>,
}

impl ResourceDescriptor {
    /// Create a pending descriptor for `address`.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            succeeded: false,
            post: None,
        }
    }

    /// The address this descriptor targets.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Whether the primary fetch completed without error.
    pub fn succeeded(&self) -> bool {
        self.succeeded
    }

    /// The fetched primary payload, if the primary fetch succeeded.
    pub fn post(&self) -> Option<&Post> {
        self.post.as_ref()
    }

    /// The dependent entries, if both fetches succeeded.
    pub fn comments(&self) -> Option<&[Comment]> {
        self.post.as_ref()?.comments.as_deref()
    }

    /// Record a successful primary fetch.
    ///
    /// Any `comments` already present on `post` are discarded; dependent entries
    /// are attached separately through [`attach_comments`](Self::attach_comments).
    pub(crate) fn record_post(&mut self, mut post: Post) {
        post.comments = None;
        self.post = Some(post);
        self.succeeded = true;
    }

    /// Attach dependent entries to the recorded post. No-op without a post.
    pub(crate) fn attach_comments(&mut self, comments: Vec<Comment>) {
        if let Some(post) = self.post.as_mut() {
            post.comments = Some(comments);
        }
    }
}

/// Event emitted while a batch is processed
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A worker picked up an item
    ItemStarted {
        /// Worker handling the item
        worker: WorkerId,
        /// Item address
        address: String,
    },

    /// A worker finished an item (successfully or not)
    ItemCompleted {
        /// Worker that handled the item
        worker: WorkerId,
        /// Item address
        address: String,
        /// Whether the primary fetch succeeded
        succeeded: bool,
        /// Whether dependent entries were attached
        with_comments: bool,
    },

    /// An item was forwarded early because the batch was cancelled
    ItemCancelled {
        /// Worker that held the item
        worker: WorkerId,
        /// Item address
        address: String,
    },

    /// The primary fetch succeeded but the dependent fetch failed
    DependentFailed {
        /// Worker that handled the item
        worker: WorkerId,
        /// Item address
        address: String,
        /// Error message
        error: String,
    },

    /// All outcomes of a batch were received
    BatchCompleted {
        /// Number of submitted items
        total: usize,
        /// Number of items whose primary fetch succeeded
        succeeded: usize,
        /// Whether the batch was cancelled before completion
        cancelled: bool,
    },
}
