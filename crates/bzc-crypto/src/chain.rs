/// A hop between two blocks, identified by their hashes.
pub trait HashLink {
    /// Hash of the block the link starts from.
    fn from_hash(&self) -> [u8; 32];
    /// Hash of the block the link points to.
    fn to_hash(&self) -> [u8; 32];
}

/// Verifies that a sequence of links forms an unbroken path between two
/// block hashes.
///
/// Only the hash linkage is checked here; whether each hop is endorsed by
/// enough signers is the caller's concern.
pub struct LinkChainVerifier;

impl LinkChainVerifier {
    /// Verify that `links` lead from `start` to `end`.
    ///
    /// Checks:
    /// 1. An empty path is only valid when `start == end`
    /// 2. The first link starts at `start`
    /// 3. Each link starts where the previous one ended
    /// 4. The last link ends at `end`
    pub fn verify_path(
        start: [u8; 32],
        end: [u8; 32],
        links: &[impl HashLink],
    ) -> Result<(), ChainError> {
        if links.is_empty() {
            return if start == end {
                Ok(())
            } else {
                Err(ChainError::MissingLinks)
            };
        }

        if links[0].from_hash() != start {
            return Err(ChainError::WrongStart);
        }

        for i in 1..links.len() {
            if links[i].from_hash() != links[i - 1].to_hash() {
                return Err(ChainError::BrokenLink { index: i });
            }
        }

        if links[links.len() - 1].to_hash() != end {
            return Err(ChainError::WrongEnd);
        }

        Ok(())
    }
}

/// Errors from link path verification.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ChainError {
    #[error("no links given but start and end blocks differ")]
    MissingLinks,

    #[error("first link does not start at the trusted block")]
    WrongStart,

    #[error("broken link at index {index}: does not start where the previous link ended")]
    BrokenLink { index: usize },

    #[error("last link does not end at the expected block")]
    WrongEnd,
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestLink {
        from: [u8; 32],
        to: [u8; 32],
    }

    impl HashLink for TestLink {
        fn from_hash(&self) -> [u8; 32] {
            self.from
        }
        fn to_hash(&self) -> [u8; 32] {
            self.to
        }
    }

    fn build_path(count: u8) -> Vec<TestLink> {
        (0..count)
            .map(|i| TestLink {
                from: [i; 32],
                to: [i + 1; 32],
            })
            .collect()
    }

    #[test]
    fn empty_path_same_block() {
        let links: Vec<TestLink> = vec![];
        assert!(LinkChainVerifier::verify_path([1; 32], [1; 32], &links).is_ok());
    }

    #[test]
    fn empty_path_different_blocks() {
        let links: Vec<TestLink> = vec![];
        assert_eq!(
            LinkChainVerifier::verify_path([1; 32], [2; 32], &links),
            Err(ChainError::MissingLinks)
        );
    }

    #[test]
    fn multi_link_path() {
        let links = build_path(5);
        assert!(LinkChainVerifier::verify_path([0; 32], [5; 32], &links).is_ok());
    }

    #[test]
    fn wrong_start_detected() {
        let links = build_path(3);
        assert_eq!(
            LinkChainVerifier::verify_path([9; 32], [3; 32], &links),
            Err(ChainError::WrongStart)
        );
    }

    #[test]
    fn broken_link_detected() {
        let mut links = build_path(3);
        links[2].from = [99; 32];
        assert_eq!(
            LinkChainVerifier::verify_path([0; 32], [3; 32], &links),
            Err(ChainError::BrokenLink { index: 2 })
        );
    }

    #[test]
    fn wrong_end_detected() {
        let links = build_path(3);
        assert_eq!(
            LinkChainVerifier::verify_path([0; 32], [4; 32], &links),
            Err(ChainError::WrongEnd)
        );
    }
}
