//! Header validation
//!
//! Context-free checks on a single header, plus the comparison of the header's
//! declared GHOSTDAG values against the computed ones.

use consensus_core::config::ConsensusConfig;
use consensus_core::constants::BLOCK_VERSION;
use consensus_core::errors::{RuleError, RuleResult};
use consensus_core::ghostdag::GhostdagData;
use consensus_core::header::Header;
use consensus_core::BlockHashSet;
use jio_math::{compact_to_target, U256};

/// Header validator for consensus rules
pub struct HeaderValidator {
    max_block_parents: usize,
    skip_proof_of_work: bool,
}

impl HeaderValidator {
    pub fn new(config: &ConsensusConfig) -> Self {
        Self::with_params(config.max_block_parents, config.skip_proof_of_work)
    }

    pub fn with_params(max_block_parents: usize, skip_proof_of_work: bool) -> Self {
        Self { max_block_parents, skip_proof_of_work }
    }

    /// Checks that need nothing but the header itself
    pub fn validate_header_in_isolation(&self, header: &Header) -> RuleResult<()> {
        if header.version != BLOCK_VERSION {
            return Err(RuleError::WrongBlockVersion(header.version, BLOCK_VERSION));
        }
        self.check_parents(header)?;
        self.check_pow(header)
    }

    fn check_parents(&self, header: &Header) -> RuleResult<()> {
        let parents = header.direct_parents();
        if parents.is_empty() {
            return Err(RuleError::NoParents);
        }
        if parents.len() > self.max_block_parents {
            return Err(RuleError::TooManyParents(parents.len(), self.max_block_parents));
        }
        let mut seen = BlockHashSet::with_capacity(parents.len());
        for parent in parents {
            if !seen.insert(*parent) {
                return Err(RuleError::DuplicateParents(*parent));
            }
        }
        Ok(())
    }

    fn check_pow(&self, header: &Header) -> RuleResult<()> {
        let target = match compact_to_target(header.bits) {
            Some(target) if !target.is_zero() => target,
            _ => return Err(RuleError::InvalidDifficultyBits(header.bits)),
        };
        if self.skip_proof_of_work {
            return Ok(());
        }
        // the hash is read as a little-endian 256-bit number
        if U256::from_little_endian(header.hash.as_bytes()) > target {
            return Err(RuleError::InvalidPoW);
        }
        Ok(())
    }

    /// The header must declare exactly the blue score and work GHOSTDAG computed for it
    pub fn validate_ghostdag_commitments(&self, header: &Header, ghostdag_data: &GhostdagData) -> RuleResult<()> {
        if header.blue_score != ghostdag_data.blue_score {
            return Err(RuleError::UnexpectedBlueScore(header.blue_score, ghostdag_data.blue_score));
        }
        if header.blue_work != ghostdag_data.blue_work {
            return Err(RuleError::UnexpectedBlueWork(header.blue_work, ghostdag_data.blue_work));
        }
        Ok(())
    }
}
