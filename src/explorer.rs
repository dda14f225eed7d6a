//! Read-request resolution
//!
//! Entity reads go [source → cache → in-memory query]; correlation goes
//! [cache → indexer → telemetry SQL]. Both answer with the same envelope.

use log::debug;
use serde::Serialize;

use crate::cache::{CachedCaseSource, CaseData};
use crate::correlate::{self, Contribution, IndicatorCounts};
use crate::error::{ConfigError, Result};
use crate::models::EntityKind;
use crate::query::{QueryRequest, QueryResult, query_records};
use crate::source::CaseSource;
use crate::telemetry::{Predicate, TelemetryDb};

/// Availability of each correlation source
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceStatus {
    pub iocs: String,
    pub assets: String,
}

/// Telemetry page plus the indicators that scoped it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationResult {
    #[serde(flatten)]
    pub result: QueryResult,
    pub indicators: IndicatorCounts,
    pub sources: SourceStatus,
}

/// Answers read requests for one credential
pub struct Explorer {
    cases: CachedCaseSource<dyn CaseSource>,
    telemetry: Option<TelemetryDb>,
}

impl Explorer {
    pub fn new(cases: CachedCaseSource<dyn CaseSource>, telemetry: Option<TelemetryDb>) -> Self {
        Self { cases, telemetry }
    }

    fn telemetry(&self) -> Result<&TelemetryDb> {
        self.telemetry
            .as_ref()
            .ok_or_else(|| ConfigError::MissingDatabase("telemetry").into())
    }

    /// Page through the case listing
    pub async fn query_cases(&self, request: &QueryRequest, bypass: bool) -> Result<QueryResult> {
        let cases = self.cases.cases(bypass).await?;
        Ok(query_records(cases.records(), request))
    }

    /// Page through one entity of a case
    pub async fn query_entity(
        &self,
        case_id: i64,
        kind: EntityKind,
        request: &QueryRequest,
        bypass: bool,
    ) -> Result<QueryResult> {
        let data = self.cases.entity(case_id, kind, bypass).await?;
        debug!("Querying {} {} records of case {}", data.len(), kind, case_id);
        Ok(query_records(data.records(), request))
    }

    /// Every entity of a case
    pub async fn case_data(&self, case_id: i64, bypass: bool) -> Result<CaseData> {
        self.cases.case_data(case_id, bypass).await
    }

    /// Telemetry rows matching the case's indicators.
    ///
    /// IOC and asset fetch failures are absorbed: the failed source
    /// contributes no indicators and is reported in `sources`.
    pub async fn correlate(
        &self,
        case_id: i64,
        request: &QueryRequest,
        bypass: bool,
    ) -> Result<CorrelationResult> {
        let telemetry = self.telemetry()?;

        let (iocs, assets) = futures::join!(
            self.cases.entity(case_id, EntityKind::Iocs, bypass),
            self.cases.entity(case_id, EntityKind::Assets, bypass),
        );
        let iocs = Contribution::from_fetch("iocs", iocs);
        let assets = Contribution::from_fetch("assets", assets);

        let indicators = correlate::index(&iocs, &assets);
        debug!(
            "Case {} indicators: {} ips, {} hostnames, {} asns",
            case_id,
            indicators.ips.len(),
            indicators.hostnames.len(),
            indicators.asns.len()
        );
        let counts = indicators.counts();

        let result = telemetry
            .query(request, &Predicate::Indicators(indicators))
            .await?;

        Ok(CorrelationResult {
            result,
            indicators: counts,
            sources: SourceStatus {
                iocs: iocs.status(),
                assets: assets.status(),
            },
        })
    }

    /// Drop cached data for a case; returns the number of entries removed
    pub fn invalidate(&self, case_id: i64, entity: Option<EntityKind>) -> usize {
        self.cases.invalidate(case_id, entity)
    }
}
