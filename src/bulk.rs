use crate::{
    document::{Document, IndexAction},
    error::RuntimeError,
};

/// Default number of documents in one bulk request.
pub const DEFAULT_MAX_ACTIONS: usize = 5_000;

/// Default size of one bulk request body.
pub const DEFAULT_MAX_BYTES: usize = 5 * 1024 * 1024;

/// Bounds applied to every bulk request body.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BulkLimits {
    /// Maximum documents per request
    pub max_actions: usize,
    /// Maximum body size in bytes, a single oversized pair is still sent alone
    pub max_bytes: usize,
}

impl Default for BulkLimits {
    fn default() -> Self {
        BulkLimits {
            max_actions: DEFAULT_MAX_ACTIONS,
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }
}

/// One newline-delimited bulk body, ready to be signed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BulkChunk {
    /// Body sent to `_bulk`
    pub body: String,
    /// Number of action/document pairs in the body
    pub actions: usize,
}

/// Encode pairs into a single bulk body, two newline-terminated lines per pair.
pub fn encode<'a, I>(pairs: I) -> Result<String, RuntimeError>
where
    I: IntoIterator<Item = (&'a IndexAction, &'a Document)>,
{
    let mut body = String::new();
    for (action, document) in pairs {
        body.push_str(&serde_json::to_string(action)?);
        body.push('\n');
        body.push_str(&serde_json::to_string(document)?);
        body.push('\n');
    }
    Ok(body)
}

/// Splits a stream of pairs into bulk bodies that respect [`BulkLimits`].
#[derive(Debug)]
pub struct BulkEncoder {
    limits: BulkLimits,
    current: BulkChunk,
    chunks: Vec<BulkChunk>,
}

impl BulkEncoder {
    /// Create an empty encoder.
    pub fn new(limits: BulkLimits) -> BulkEncoder {
        BulkEncoder {
            limits,
            current: BulkChunk::default(),
            chunks: Vec::new(),
        }
    }

    /// Append one pair, closing the current chunk first if the pair doesn't fit.
    pub fn push(&mut self, action: &IndexAction, document: &Document) -> Result<(), RuntimeError> {
        let lines = encode(std::iter::once((action, document)))?;

        let full = self.current.actions >= self.limits.max_actions
            || self.current.body.len() + lines.len() > self.limits.max_bytes;
        if self.current.actions > 0 && full {
            self.chunks.push(std::mem::take(&mut self.current));
        }

        self.current.body.push_str(&lines);
        self.current.actions += 1;
        Ok(())
    }

    /// Number of pairs pushed so far.
    pub fn actions(&self) -> usize {
        self.chunks.iter().map(|c| c.actions).sum::<usize>() + self.current.actions
    }

    /// Close the encoder and return the chunks in push order.
    pub fn finish(mut self) -> Vec<BulkChunk> {
        if self.current.actions > 0 {
            self.chunks.push(self.current);
        }
        self.chunks
    }
}
