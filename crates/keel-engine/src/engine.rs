//! The risk engine.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use keel_config::{ConfigStore, MarginConfig, RiskSettings, Validate};
use keel_core::freshness::ensure_fresh;
use keel_core::{
    AnalyticsError, AnalyticsResult, CancellationToken, Portfolio, Position, ReturnSeries,
    Symbol, Weights,
};
use keel_margin::{
    margin_health_ratio, position_liquidation_price, DebtEntry, DebtLedger, DebtSummary,
    LeverageChange, LeverageInfo, LeverageManager, LeverageRequest, LeverageSetting, MarginMonitor,
    MarginState, RepaymentAllocation,
};
use keel_portfolio::stress::{pnl_by_scenario, run_stress_scenarios};
use keel_portfolio::{
    EfficientFrontierPoint, MarketEstimates, PortfolioOptimizationResult, PortfolioOptimizer,
    RebalancePlan, Rebalancer, StressResult, StressScenario,
};
use keel_traits::{MarginConfigSource, PositionSource, ReturnSeriesSource};
use keel_var::{portfolio_return_series, VaRCalculator, VaRRequest, VaRResult};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{EngineError, EngineResult};

/// Scenario count from which stress runs use the thread pool.
const STRESS_PARALLEL_THRESHOLD: usize = 8;

/// Margin figures and lifecycle state of one open position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarginStatus {
    /// Symbol.
    pub symbol: Symbol,
    /// State after this evaluation.
    pub state: MarginState,
    /// Equity over maintenance margin. `None` when nothing is required.
    pub health_ratio: Option<Decimal>,
    /// Liquidation price at the position's leverage.
    pub liquidation_price: Decimal,
}

/// Risk engine over injected collaborators.
///
/// Collaborator data is awaited once per request, checked for freshness and
/// then handed to the synchronous analytics on a blocking worker. Settings are
/// read as one snapshot per request.
///
/// Leverage settings, the debt ledger and margin monitors are the only state
/// the engine owns; each sits behind its own mutex that is never held across
/// an await.
pub struct RiskEngine {
    returns: Arc<dyn ReturnSeriesSource>,
    positions: Arc<dyn PositionSource>,
    margin: Arc<dyn MarginConfigSource>,
    config: Arc<ConfigStore>,
    leverage: Mutex<LeverageManager>,
    ledger: Mutex<DebtLedger>,
    monitors: Mutex<BTreeMap<Symbol, MarginMonitor>>,
}

impl std::fmt::Debug for RiskEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RiskEngine").finish_non_exhaustive()
    }
}

impl RiskEngine {
    pub(crate) fn new(
        returns: Arc<dyn ReturnSeriesSource>,
        positions: Arc<dyn PositionSource>,
        margin: Arc<dyn MarginConfigSource>,
        config: Arc<ConfigStore>,
    ) -> EngineResult<Self> {
        let settings = config.snapshot();
        let ledger = DebtLedger::new(
            settings.margin.daily_interest_rate,
            settings.margin.repayment_policy,
        )?;
        info!(
            repayment_policy = %settings.margin.repayment_policy,
            daily_interest_rate = %settings.margin.daily_interest_rate,
            "Risk engine created"
        );
        Ok(Self {
            returns,
            positions,
            margin,
            config,
            leverage: Mutex::new(LeverageManager::new()),
            ledger: Mutex::new(ledger),
            monitors: Mutex::new(BTreeMap::new()),
        })
    }

    /// Current settings snapshot.
    pub fn settings(&self) -> Arc<RiskSettings> {
        self.config.snapshot()
    }

    /// The settings store.
    pub fn config_store(&self) -> &Arc<ConfigStore> {
        &self.config
    }

    /// Margin configuration from the collaborator, validated.
    pub async fn margin_config(&self) -> EngineResult<MarginConfig> {
        let config = self.margin.get_margin_config().await?;
        config.validate_or_error()?;
        Ok(config)
    }

    /// Total portfolio value reported by the position source.
    pub async fn portfolio_value(&self) -> EngineResult<Decimal> {
        Ok(self.positions.get_portfolio_value().await?)
    }

    // =========================================================================
    // VAR
    // =========================================================================

    /// VaR and CVaR of the open positions.
    ///
    /// Positions are weighted by market value and their return series are
    /// aggregated into one portfolio series over the configured lookback.
    pub async fn calculate_var(
        &self,
        request: VaRRequest,
        cancel: &CancellationToken,
    ) -> EngineResult<VaRResult> {
        let settings = self.settings();
        let positions = self.fetch_positions(&settings).await?;
        let weights = Portfolio::from_positions(positions)?.weights()?;
        self.var_for_weights(request, &weights, &settings, cancel)
            .await
    }

    /// CVaR of the open positions.
    pub async fn calculate_cvar(
        &self,
        request: VaRRequest,
        cancel: &CancellationToken,
    ) -> EngineResult<Decimal> {
        self.calculate_var(request, cancel).await.map(|r| r.cvar)
    }

    /// VaR and CVaR of a weighted portfolio.
    pub async fn calculate_var_for_weights(
        &self,
        request: VaRRequest,
        weights: &Weights,
        cancel: &CancellationToken,
    ) -> EngineResult<VaRResult> {
        let settings = self.settings();
        self.var_for_weights(request, weights, &settings, cancel)
            .await
    }

    async fn var_for_weights(
        &self,
        request: VaRRequest,
        weights: &Weights,
        settings: &RiskSettings,
        cancel: &CancellationToken,
    ) -> EngineResult<VaRResult> {
        let started = Instant::now();
        let symbols: Vec<Symbol> = weights.symbols().cloned().collect();
        let series = self
            .fetch_series(&symbols, settings.var.returns_lookback, settings)
            .await?;
        let returns = portfolio_return_series(&series, weights)?;

        let calculator = VaRCalculator::new(settings.var);
        let cancel = cancel.clone();
        let result = run_blocking("VaR", move || {
            calculator.calculate(&request, &returns, &cancel)
        })
        .await?;

        info!(
            method = %result.method,
            confidence = result.confidence_level,
            horizon_days = result.horizon_days,
            var = %result.var,
            cvar = %result.cvar,
            elapsed = ?started.elapsed(),
            "VaR calculated"
        );
        Ok(result)
    }

    // =========================================================================
    // OPTIMIZER
    // =========================================================================

    /// `points` efficient-frontier portfolios ordered by increasing risk.
    pub async fn calculate_efficient_frontier(
        &self,
        symbols: &[Symbol],
        lookback: usize,
        points: usize,
        cancel: &CancellationToken,
    ) -> EngineResult<Vec<EfficientFrontierPoint>> {
        let started = Instant::now();
        let settings = self.settings();
        let series = self.fetch_series(symbols, lookback, &settings).await?;
        let optimizer = PortfolioOptimizer::new(settings.optimizer.clone());
        let cancel = cancel.clone();

        let frontier = run_blocking("efficient frontier", move || {
            let estimates = MarketEstimates::from_series(&series, lookback, optimizer.config())?;
            optimizer.efficient_frontier(&estimates, points, &cancel)
        })
        .await?;

        info!(
            assets = symbols.len(),
            points = frontier.len(),
            elapsed = ?started.elapsed(),
            "Efficient frontier calculated"
        );
        Ok(frontier)
    }

    /// The portfolio with the highest Sharpe ratio.
    pub async fn calculate_max_sharpe_portfolio(
        &self,
        symbols: &[Symbol],
        lookback: usize,
        risk_free_rate: f64,
        cancel: &CancellationToken,
    ) -> EngineResult<PortfolioOptimizationResult> {
        let settings = self.settings();
        let series = self.fetch_series(symbols, lookback, &settings).await?;
        let optimizer = PortfolioOptimizer::new(settings.optimizer.clone());
        let cancel = cancel.clone();

        let result = run_blocking("max sharpe", move || {
            let estimates = MarketEstimates::from_series(&series, lookback, optimizer.config())?;
            optimizer.max_sharpe(&estimates, risk_free_rate, &cancel)
        })
        .await?;

        info!(
            assets = symbols.len(),
            sharpe = result.sharpe_ratio,
            risk = result.risk,
            "Max-Sharpe portfolio calculated"
        );
        Ok(result)
    }

    /// The portfolio with the lowest risk.
    pub async fn calculate_minimum_variance_portfolio(
        &self,
        symbols: &[Symbol],
        lookback: usize,
    ) -> EngineResult<PortfolioOptimizationResult> {
        let settings = self.settings();
        let series = self.fetch_series(symbols, lookback, &settings).await?;
        let optimizer = PortfolioOptimizer::new(settings.optimizer.clone());

        let result = run_blocking("min variance", move || {
            let estimates = MarketEstimates::from_series(&series, lookback, optimizer.config())?;
            optimizer.min_variance(&estimates)
        })
        .await?;

        info!(
            assets = symbols.len(),
            risk = result.risk,
            "Minimum-variance portfolio calculated"
        );
        Ok(result)
    }

    // =========================================================================
    // REBALANCING
    // =========================================================================

    /// Signed value to trade per symbol to reach `target`.
    pub fn calculate_rebalancing_trades(
        &self,
        positions: &[Position],
        target: &Weights,
        total_value: Decimal,
    ) -> EngineResult<BTreeMap<Symbol, Decimal>> {
        Ok(self
            .rebalancing_plan(positions, target, total_value)?
            .deltas())
    }

    /// Full rebalancing plan, including trades skipped by the trade band.
    pub fn rebalancing_plan(
        &self,
        positions: &[Position],
        target: &Weights,
        total_value: Decimal,
    ) -> EngineResult<RebalancePlan> {
        let rebalancer = Rebalancer::new(self.settings().rebalance);
        let plan = rebalancer.from_positions(positions, target, total_value)?;
        debug!(
            trades = plan.trade_count(),
            skipped = plan.skipped.len(),
            turnover = %plan.turnover,
            "Rebalancing plan built"
        );
        Ok(plan)
    }

    /// Rebalances the open positions at the reported portfolio value.
    pub async fn rebalance_to(&self, target: &Weights) -> EngineResult<RebalancePlan> {
        let settings = self.settings();
        let positions = self.fetch_positions(&settings).await?;
        let total_value = self.portfolio_value().await?;
        self.rebalancing_plan(&positions, target, total_value)
    }

    // =========================================================================
    // STRESS TESTING
    // =========================================================================

    /// Per-scenario, per-symbol P&L keyed by scenario name.
    pub async fn perform_stress_test(
        &self,
        positions: &[Position],
        scenarios: &[StressScenario],
        cancel: &CancellationToken,
    ) -> EngineResult<BTreeMap<String, BTreeMap<Symbol, Decimal>>> {
        let results = self.run_stress_test(positions, scenarios, cancel).await?;
        Ok(pnl_by_scenario(&results))
    }

    /// Full stress results in scenario order.
    ///
    /// Positions are copied into the computation; the caller's snapshots are
    /// never modified.
    pub async fn run_stress_test(
        &self,
        positions: &[Position],
        scenarios: &[StressScenario],
        cancel: &CancellationToken,
    ) -> EngineResult<Vec<StressResult>> {
        let positions = positions.to_vec();
        let scenarios = scenarios.to_vec();
        let cancel = cancel.clone();

        let results = run_blocking("stress test", move || {
            run_stress_scenarios(&positions, &scenarios, STRESS_PARALLEL_THRESHOLD, &cancel)
        })
        .await?;

        for result in results.iter().filter(|r| r.is_loss()) {
            debug!(
                scenario = %result.scenario_name,
                pnl = %result.total_pnl,
                pnl_pct = %result.pnl_pct,
                "Stress loss"
            );
        }
        info!(scenarios = results.len(), "Stress test completed");
        Ok(results)
    }

    // =========================================================================
    // LEVERAGE
    // =========================================================================

    /// Validates and records a leverage change.
    ///
    /// Requests above the configured maximum fail with
    /// `LeverageLimitExceeded` and leave the previous setting in place. When a
    /// position is open for the symbol, the result carries its liquidation
    /// price and health ratio at the new leverage.
    pub async fn set_leverage(&self, request: LeverageRequest) -> EngineResult<LeverageInfo> {
        let settings = self.settings();
        let config = self.margin_config().await?;
        let positions = self.fetch_positions(&settings).await?;
        let position = positions.iter().find(|p| p.symbol == request.symbol);

        let symbol = request.symbol.clone();
        let requested = request.leverage;
        let result = self
            .leverage
            .lock()
            .set_leverage(request, position, &config, Utc::now());

        match &result {
            Ok(info) => info!(
                symbol = %symbol,
                leverage = %info.leverage,
                margin_type = %info.margin_type,
                "Leverage changed"
            ),
            Err(e) => warn!(
                symbol = %symbol,
                requested = %requested,
                error = %e,
                "Leverage change rejected"
            ),
        }
        Ok(result?)
    }

    /// Current leverage setting of a symbol.
    pub fn leverage_setting(&self, symbol: &Symbol) -> Option<LeverageSetting> {
        self.leverage.lock().setting(symbol)
    }

    /// Every accepted leverage change, oldest first.
    pub fn leverage_history(&self) -> Vec<LeverageChange> {
        self.leverage.lock().history().to_vec()
    }

    // =========================================================================
    // DEBT
    // =========================================================================

    /// Records borrowed capital against a symbol.
    pub fn borrow(&self, symbol: &Symbol, amount: Decimal) -> EngineResult<DebtEntry> {
        let entry = self.ledger.lock().borrow(symbol, amount, Utc::now())?.clone();
        info!(symbol = %symbol, amount = %amount, principal = %entry.principal_after, "Borrowed");
        Ok(entry)
    }

    /// Repays debt of a symbol under the configured repayment policy.
    pub fn repay(&self, symbol: &Symbol, amount: Decimal) -> EngineResult<RepaymentAllocation> {
        let allocation = self.ledger.lock().repay(symbol, amount, Utc::now())?;
        info!(
            symbol = %symbol,
            principal = %allocation.principal,
            interest = %allocation.interest,
            "Repaid"
        );
        Ok(allocation)
    }

    /// Ledger entries, oldest first.
    pub fn debt_entries(&self) -> Vec<DebtEntry> {
        self.ledger.lock().entries().to_vec()
    }

    /// Account debt and cross-margin health.
    ///
    /// Interest is charged up to now before aggregating.
    pub async fn get_debt_summary(&self) -> EngineResult<DebtSummary> {
        let settings = self.settings();
        let config = self.margin_config().await?;
        let positions = self.fetch_positions(&settings).await?;

        let now = Utc::now();
        let summary = {
            let mut ledger = self.ledger.lock();
            let charged = ledger.accrue_all(now);
            if !charged.is_zero() {
                debug!(interest = %charged, "Interest accrued");
            }
            DebtSummary::aggregate(&positions, Some(&ledger), &config, now)
        };

        if summary.margin_call {
            warn!(
                health_ratio = ?summary.margin_health_ratio,
                equity = %summary.total_equity,
                maintenance_margin = %summary.maintenance_margin,
                "Account under margin call"
            );
        }
        Ok(summary)
    }

    // =========================================================================
    // MARGIN MONITORING
    // =========================================================================

    /// Evaluates every open position and advances its margin lifecycle.
    ///
    /// A symbol whose previous position ended in a terminal state starts a new
    /// lifecycle. The book is evaluated as a whole: if any position cannot be
    /// evaluated, the error names it and no monitor changes.
    pub async fn evaluate_margin(&self) -> EngineResult<Vec<MarginStatus>> {
        let settings = self.settings();
        let config = self.margin_config().await?;
        let positions = self.fetch_positions(&settings).await?;
        let now = Utc::now();

        let mut seen = BTreeSet::new();
        let mut prepared = Vec::with_capacity(positions.len());
        for position in &positions {
            if !seen.insert(&position.symbol) {
                return Err(AnalyticsError::invalid_parameter(
                    "positions",
                    &position.symbol,
                    "duplicate symbol in margin book",
                )
                .into());
            }
            let rate = config.maintenance_margin_rate_for(&position.symbol);
            let liquidation_price = position_liquidation_price(position, rate)?;
            prepared.push((position, liquidation_price, margin_health_ratio(position, rate)));
        }

        let mut monitors = self.monitors.lock();
        let mut updated = Vec::with_capacity(prepared.len());
        let mut statuses = Vec::with_capacity(prepared.len());
        for (position, liquidation_price, health_ratio) in prepared {
            let mut monitor = match monitors.get(&position.symbol) {
                Some(m) if !m.state().is_terminal() => m.clone(),
                _ => MarginMonitor::new(position.symbol.clone()),
            };
            let previous = monitor.state();
            let state = monitor.evaluate_position(position, &config, now)?;
            updated.push((monitor, previous));
            statuses.push(MarginStatus {
                symbol: position.symbol.clone(),
                state,
                health_ratio,
                liquidation_price,
            });
        }

        for ((monitor, previous), status) in updated.into_iter().zip(&statuses) {
            if status.state != previous
                && matches!(status.state, MarginState::MarginCall | MarginState::Liquidated)
            {
                warn!(
                    symbol = %status.symbol,
                    from = %previous,
                    to = %status.state,
                    health_ratio = ?status.health_ratio,
                    "Margin state changed"
                );
            }
            monitors.insert(status.symbol.clone(), monitor);
        }
        Ok(statuses)
    }

    /// Closes the monitored position of a symbol.
    pub fn close_position(&self, symbol: &Symbol) -> EngineResult<()> {
        let mut monitors = self.monitors.lock();
        let monitor = monitors.get_mut(symbol).ok_or_else(|| {
            AnalyticsError::invalid_parameter("symbol", symbol, "no monitored position")
        })?;
        monitor.close(Utc::now())?;
        info!(symbol = %symbol, "Position closed");
        Ok(())
    }

    /// Margin state of a monitored symbol.
    pub fn margin_state(&self, symbol: &Symbol) -> Option<MarginState> {
        self.monitors.lock().get(symbol).map(MarginMonitor::state)
    }

    // =========================================================================
    // COLLABORATORS
    // =========================================================================

    async fn fetch_positions(&self, settings: &RiskSettings) -> EngineResult<Vec<Position>> {
        let positions = self.positions.get_positions().await?;
        let now = Utc::now();
        let max_age = settings.freshness.max_positions_age();
        for p in &positions {
            ensure_fresh(&format!("position:{}", p.symbol), p.updated_at, now, max_age)?;
        }
        Ok(positions)
    }

    async fn fetch_series(
        &self,
        symbols: &[Symbol],
        lookback: usize,
        settings: &RiskSettings,
    ) -> EngineResult<Vec<ReturnSeries>> {
        if symbols.is_empty() {
            return Err(
                AnalyticsError::invalid_parameter("symbols", "[]", "empty symbol universe").into(),
            );
        }
        let series = self.returns.get_return_series_batch(symbols, lookback).await?;
        let now = Utc::now();
        let max_age = settings.freshness.max_returns_age();
        for s in &series {
            ensure_fresh(&format!("returns:{}", s.symbol), s.as_of, now, max_age)?;
        }
        Ok(series)
    }
}

/// Runs a CPU-bound computation on the blocking pool.
async fn run_blocking<T, F>(operation: &'static str, f: F) -> EngineResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> AnalyticsResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| EngineError::Internal(format!("{operation} task failed: {e}")))?
        .map_err(EngineError::from)
}
