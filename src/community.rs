//! Community solar pool: members own percentage shares of a shared
//! installation, and every recorded generation is split between them.
//!
//! Energy is accounted in fixed-point units of 10^-7 kWh, so each share is
//! `generated * percent / 100` truncated to seven decimals and shares never
//! add up to more than what was generated.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::session::store::{KeyValueStore, RetrievalMode, StorageError, TypedStoreExt, keys};
use crate::session::short_address;

/// Fixed-point units per kWh.
pub const UNITS_PER_KWH: f64 = 10_000_000.0;

#[derive(Error, Debug)]
pub enum CommunityError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("no community pool set up; run `beenergy community init <approvals>` first")]
    NotSetUp,

    #[error("{required} approvals required, got {given}")]
    NotEnoughApprovers { required: u32, given: usize },

    #[error("{members} members but {percents} percentages")]
    MemberPercentMismatch { members: usize, percents: usize },

    #[error("member percentages must sum to 100, got {0}")]
    PercentsMustSumTo100(u64),

    #[error("{0} is listed more than once")]
    DuplicateMember(String),

    #[error("members have not been set up")]
    MembersNotInitialized,

    #[error("generated energy must be greater than 0, got {0}")]
    NonPositiveGeneration(f64),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub address: String,
    pub percent: u32,
}

/// One member's cut of a generation record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationShare {
    pub address: String,
    pub kwh: f64,
}

impl fmt::Display for GenerationShare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<14} +{} kWh", short_address(&self.address), self.kwh)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityPool {
    /// Distinct approvers needed to replace the member list.
    pub required_approvals: u32,
    pub members: Vec<Member>,
    /// Total recorded generation, in fixed-point units.
    pub total_generated: i128,
}

impl CommunityPool {
    pub fn new(required_approvals: u32) -> Self {
        Self {
            required_approvals,
            members: Vec::new(),
            total_generated: 0,
        }
    }

    pub fn load<S: KeyValueStore + ?Sized>(store: &S) -> Result<Option<Self>, CommunityError> {
        Ok(store.get_json(keys::COMMUNITY_POOL, RetrievalMode::Fail)?)
    }

    pub fn save<S: KeyValueStore + ?Sized>(&self, store: &mut S) -> Result<(), CommunityError> {
        store.set_json(keys::COMMUNITY_POOL, self)?;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        !self.members.is_empty()
    }

    pub fn percent_of(&self, address: &str) -> Option<u32> {
        self.members
            .iter()
            .find(|m| m.address == address)
            .map(|m| m.percent)
    }

    pub fn total_generated_kwh(&self) -> f64 {
        to_kwh(self.total_generated)
    }

    /// Replaces the member list.
    ///
    /// Needs at least `required_approvals` distinct approvers, one
    /// percentage per member, no repeated member, and percentages summing
    /// to exactly 100. Nothing changes on error.
    pub fn set_members(
        &mut self,
        approvers: &[String],
        members: &[String],
        percents: &[u32],
    ) -> Result<(), CommunityError> {
        let distinct: HashSet<&str> = approvers.iter().map(String::as_str).collect();
        if distinct.len() < self.required_approvals as usize {
            return Err(CommunityError::NotEnoughApprovers {
                required: self.required_approvals,
                given: distinct.len(),
            });
        }
        if members.len() != percents.len() {
            return Err(CommunityError::MemberPercentMismatch {
                members: members.len(),
                percents: percents.len(),
            });
        }

        let mut seen = HashSet::new();
        if let Some(dup) = members.iter().find(|m| !seen.insert(m.as_str())) {
            return Err(CommunityError::DuplicateMember(dup.clone()));
        }

        let total: u64 = percents.iter().map(|&p| u64::from(p)).sum();
        if total != 100 {
            return Err(CommunityError::PercentsMustSumTo100(total));
        }

        self.members = members
            .iter()
            .zip(percents)
            .map(|(address, &percent)| Member {
                address: address.clone(),
                percent,
            })
            .collect();
        Ok(())
    }

    /// Records `kwh` of generation and returns each member's share, in
    /// member order.
    pub fn record_generation(&mut self, kwh: f64) -> Result<Vec<GenerationShare>, CommunityError> {
        if !self.is_initialized() {
            return Err(CommunityError::MembersNotInitialized);
        }
        if kwh <= 0.0 || !kwh.is_finite() {
            return Err(CommunityError::NonPositiveGeneration(kwh));
        }

        let units = (kwh * UNITS_PER_KWH).round() as i128;
        let shares = self
            .members
            .iter()
            .map(|m| GenerationShare {
                address: m.address.clone(),
                kwh: to_kwh(units * i128::from(m.percent) / 100),
            })
            .collect();
        self.total_generated = self.total_generated.saturating_add(units);
        tracing::info!(kwh, members = self.members.len(), "generation recorded");
        Ok(shares)
    }
}

fn to_kwh(units: i128) -> f64 {
    units as f64 / UNITS_PER_KWH
}

/// Parses `ADDRESS:PERCENT`.
pub fn parse_member(spec: &str) -> Result<(String, u32), String> {
    let (address, percent) = spec
        .rsplit_once(':')
        .ok_or_else(|| format!("expected ADDRESS:PERCENT, got \"{spec}\""))?;
    if address.is_empty() {
        return Err(format!("missing address in \"{spec}\""));
    }
    let percent = percent
        .parse()
        .map_err(|_| format!("invalid percent in \"{spec}\""))?;
    Ok((address.to_string(), percent))
}
