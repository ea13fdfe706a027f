//! Combining domain-level and page-level image lists.

use crate::config::MergeStrategy;

/// Output positions used by [`MergeStrategy::FixedOffset`].
pub const FIXED_OFFSETS: [usize; 5] = [2, 5, 10, 15, 20];

/// Merges the two image sets into one ranked list.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultMerger {
    strategy: MergeStrategy,
}

impl ResultMerger {
    /// Creates a merger with the given strategy.
    #[must_use]
    pub fn new(strategy: MergeStrategy) -> Self {
        Self { strategy }
    }

    /// Gets the strategy.
    #[must_use]
    pub fn strategy(&self) -> MergeStrategy {
        self.strategy
    }

    /// Merges page-level and domain-level images.
    #[must_use]
    pub fn merge(&self, page_images: Vec<String>, domain_images: Vec<String>) -> Vec<String> {
        match self.strategy {
            MergeStrategy::Interleave => interleave(page_images, domain_images),
            MergeStrategy::FixedOffset => splice_fixed_offsets(page_images, domain_images),
        }
    }
}

/// Alternates page and domain images, page first, then appends whatever
/// remains of the longer list.
#[must_use]
pub fn interleave(page_images: Vec<String>, domain_images: Vec<String>) -> Vec<String> {
    let mut merged = Vec::with_capacity(page_images.len() + domain_images.len());
    let mut page = page_images.into_iter();
    let mut domain = domain_images.into_iter();

    loop {
        match (page.next(), domain.next()) {
            (Some(p), Some(d)) => {
                merged.push(p);
                merged.push(d);
            }
            (Some(p), None) => {
                merged.push(p);
                merged.extend(page);
                break;
            }
            (None, Some(d)) => {
                merged.push(d);
                merged.extend(domain);
                break;
            }
            (None, None) => break,
        }
    }

    merged
}

/// Inserts the first domain images at [`FIXED_OFFSETS`] of the page list.
///
/// Offsets past the end of the list append instead. Domain images beyond
/// the number of offsets are not used.
#[must_use]
pub fn splice_fixed_offsets(page_images: Vec<String>, domain_images: Vec<String>) -> Vec<String> {
    let mut merged = page_images;
    for (image, offset) in domain_images.into_iter().zip(FIXED_OFFSETS) {
        if offset <= merged.len() {
            merged.insert(offset, image);
        } else {
            merged.push(image);
        }
    }
    merged
}
