use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::draw_engine::{DrawEngine, DrawError, SpinOutcome};
use crate::config::DrawConfig;
use crate::error::{AppError, AppResult};
use crate::external::BackendGateway;
use crate::models::*;
use crate::utils::{Sequenced, Ticket};

const EXHAUSTED_NOTICE: &str = "Sorteo incompleto: no quedan cupones elegibles";
const CSV_HEADER: &str = "posicion,cupon,nombre,dni,ciudad,email,telefono";

struct DrawSlot {
    /// Value is the public id of the installed session
    sessions: Sequenced<Option<Uuid>>,
    active: Option<Ticket>,
    name: Option<String>,
    engine: DrawEngine<StdRng>,
    notice: Option<String>,
    executed_at: Option<DateTime<Utc>>,
    persisted: bool,
    coupons_marked: bool,
    /// A save is writing to the backend.
    saving: bool,
    /// A spin is still loading the identity of its winner.
    identity_pending: bool,
}

impl DrawSlot {
    fn clear(&mut self) {
        self.active = None;
        self.name = None;
        self.engine.reset();
        self.notice = None;
        self.executed_at = None;
        self.persisted = false;
        self.coupons_marked = false;
        self.saving = false;
        self.identity_pending = false;
    }

    fn require_active(&self) -> AppResult<Ticket> {
        self.active
            .filter(|t| self.sessions.is_current(*t))
            .ok_or(AppError::Draw(DrawError::NotStarted))
    }

    fn state(&self) -> DrawStateResponse {
        DrawStateResponse {
            session_id: *self.sessions.value(),
            name: self.name.clone(),
            phase: self.engine.phase(),
            target: self.engine.target(),
            pool_size: self.engine.pool_size(),
            remaining: self.engine.remaining(),
            winners: self.engine.winners().to_vec(),
            complete: self.engine.is_complete(),
            exhausted: self.engine.is_exhausted(),
            notice: self.notice.clone(),
            saved: self.persisted && self.coupons_marked,
        }
    }
}

/// Runs the single operator draw session against the remote coupon pool.
#[derive(Clone)]
pub struct DrawService {
    gateway: Arc<dyn BackendGateway>,
    slot: Arc<Mutex<DrawSlot>>,
    config: DrawConfig,
}

impl DrawService {
    pub fn new(gateway: Arc<dyn BackendGateway>, config: DrawConfig) -> Self {
        Self::with_rng(gateway, config, StdRng::from_entropy())
    }

    pub fn with_rng(gateway: Arc<dyn BackendGateway>, config: DrawConfig, rng: StdRng) -> Self {
        let slot = DrawSlot {
            sessions: Sequenced::new(None),
            active: None,
            name: None,
            engine: DrawEngine::new(rng),
            notice: None,
            executed_at: None,
            persisted: false,
            coupons_marked: false,
            saving: false,
            identity_pending: false,
        };
        Self {
            gateway,
            slot: Arc::new(Mutex::new(slot)),
            config,
        }
    }

    /// Start a fresh session: previous winners are discarded and the pool is
    /// fetched again.
    pub async fn start(&self, request: StartDrawRequest) -> AppResult<DrawStateResponse> {
        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::ValidationError(
                "El sorteo necesita un nombre".to_string(),
            ));
        }
        let target = request
            .winner_count
            .unwrap_or(self.config.default_winner_count);

        let ticket = {
            let mut slot = self.slot.lock().await;
            if !slot.engine.winners().is_empty() && !slot.persisted {
                log::warn!(
                    "Discarding {} unsaved winners of draw {:?}",
                    slot.engine.winners().len(),
                    slot.name
                );
            }
            slot.clear();
            slot.sessions.issue_with(None)
        };

        let pool = self.gateway.fetch_active_buyer_coupons().await?;

        let mut slot = self.slot.lock().await;
        if !slot.sessions.is_current(ticket) {
            return Err(AppError::Conflict(
                "El sorteo fue reiniciado mientras se cargaban los cupones".to_string(),
            ));
        }
        slot.engine.start_draw(pool, target)?;
        slot.sessions.apply(ticket, Some(Uuid::new_v4()));
        slot.active = Some(ticket);
        slot.name = Some(name);
        log::info!(
            "Draw {:?} started: {} eligible coupons, {} winners wanted",
            slot.name,
            slot.engine.pool_size(),
            target
        );
        Ok(slot.state())
    }

    /// Draw the next winner and load its purchase details.
    pub async fn spin(&self) -> AppResult<SpinResponse> {
        let (ticket, mut frames, outcome) = {
            let mut slot = self.slot.lock().await;
            let ticket = slot.require_active()?;
            let frames = slot.engine.spin_frames(self.config.animation_frames);
            let outcome = slot.engine.spin_next()?;
            if slot.engine.is_exhausted() {
                slot.notice = Some(EXHAUSTED_NOTICE.to_string());
            }
            if matches!(outcome, SpinOutcome::Selected(_)) {
                slot.identity_pending = true;
            }
            (ticket, frames, outcome)
        };

        let winner = match outcome {
            SpinOutcome::PoolExhausted => {
                let slot = self.slot.lock().await;
                return Ok(SpinResponse {
                    frames: Vec::new(),
                    winner: None,
                    state: slot.state(),
                });
            }
            SpinOutcome::Selected(winner) => winner,
        };
        frames.push(winner.code.clone());

        let (identity, placeholder) = self.load_identity(&winner).await;

        let mut slot = self.slot.lock().await;
        if !slot.sessions.is_current(ticket) {
            return Err(AppError::Conflict(
                "El sorteo fue reiniciado durante el giro".to_string(),
            ));
        }
        slot.identity_pending = false;
        slot.engine
            .attach_identity(&winner.code, identity, placeholder);
        let winner = slot
            .engine
            .winners()
            .iter()
            .find(|w| w.code == winner.code)
            .cloned();
        log::info!(
            "Draw {:?}: winner #{} is coupon {}",
            slot.name,
            slot.engine.winners().len(),
            winner.as_ref().map(|w| w.code.as_str()).unwrap_or_default()
        );

        Ok(SpinResponse {
            frames,
            winner,
            state: slot.state(),
        })
    }

    /// The operator finished looking at the revealed winner.
    pub async fn next(&self) -> AppResult<DrawStateResponse> {
        let mut slot = self.slot.lock().await;
        slot.require_active()?;
        slot.engine.acknowledge()?;
        Ok(slot.state())
    }

    pub async fn reset(&self) -> DrawStateResponse {
        let mut slot = self.slot.lock().await;
        if !slot.engine.winners().is_empty() && !slot.persisted {
            log::warn!("Draw {:?} reset with unsaved winners", slot.name);
        }
        slot.clear();
        slot.sessions.issue_with(None);
        slot.state()
    }

    pub async fn state(&self) -> DrawStateResponse {
        self.slot.lock().await.state()
    }

    /// Persist the completed draw and mark its coupons used.
    ///
    /// Each step is remembered, so calling again after a failure resumes at
    /// the step that failed. Only one save runs at a time, and none while the
    /// last winner's identity is still loading.
    pub async fn save(&self) -> AppResult<DrawStateResponse> {
        let (ticket, record, persisted, coupons_marked) = {
            let mut slot = self.slot.lock().await;
            let ticket = slot.require_active()?;
            if !slot.engine.is_complete() {
                return Err(AppError::ValidationError(
                    "El sorteo aún no termina".to_string(),
                ));
            }
            if slot.persisted && slot.coupons_marked {
                return Err(AppError::Conflict("El sorteo ya fue guardado".to_string()));
            }
            if slot.saving {
                return Err(AppError::Conflict(
                    "El sorteo ya se está guardando".to_string(),
                ));
            }
            if slot.identity_pending {
                return Err(AppError::Conflict(
                    "Aún se están cargando los datos del último ganador".to_string(),
                ));
            }
            slot.saving = true;
            let executed_at = *slot.executed_at.get_or_insert_with(Utc::now);
            let record = DrawResultRecord {
                name: slot.name.clone().unwrap_or_default(),
                preselected_count: slot.engine.pool_size(),
                finalists_count: slot.engine.winners().len(),
                executed_at,
                winners: slot.engine.winners().to_vec(),
            };
            (ticket, record, slot.persisted, slot.coupons_marked)
        };

        let outcome = self
            .write_result(ticket, &record, persisted, coupons_marked)
            .await;
        {
            let mut slot = self.slot.lock().await;
            if slot.sessions.is_current(ticket) {
                slot.saving = false;
            }
        }
        outcome?;

        log::info!(
            "Draw {:?} saved with {} winners",
            record.name,
            record.finalists_count
        );
        Ok(self.state().await)
    }

    /// Winners in selection order as CSV.
    pub async fn export_csv(&self) -> AppResult<String> {
        let slot = self.slot.lock().await;
        slot.require_active()?;
        let mut out = String::from(CSV_HEADER);
        out.push('\n');
        for w in slot.engine.winners() {
            let row = [
                w.position.to_string(),
                w.code.clone(),
                w.identity.full_name.clone(),
                w.identity.dni.clone(),
                w.identity.city.clone(),
                w.identity.email.clone(),
                w.identity.phone.clone(),
            ];
            let cells: Vec<String> = row.iter().map(|c| csv_cell(c)).collect();
            out.push_str(&cells.join(","));
            out.push('\n');
        }
        Ok(out)
    }

    async fn write_result(
        &self,
        ticket: Ticket,
        record: &DrawResultRecord,
        persisted: bool,
        coupons_marked: bool,
    ) -> AppResult<()> {
        if !persisted {
            self.gateway
                .persist_draw_result(record)
                .await
                .map_err(|e| AppError::Persistence(e.to_string()))?;
            self.mark_step(ticket, |slot| slot.persisted = true).await?;
        }

        if !coupons_marked {
            let codes: Vec<String> = record.winners.iter().map(|w| w.code.clone()).collect();
            self.gateway
                .mark_coupons_used(&codes)
                .await
                .map_err(|e| AppError::Persistence(e.to_string()))?;
            self.mark_step(ticket, |slot| slot.coupons_marked = true)
                .await?;
        }
        Ok(())
    }

    async fn mark_step(&self, ticket: Ticket, step: impl FnOnce(&mut DrawSlot)) -> AppResult<()> {
        let mut slot = self.slot.lock().await;
        if !slot.sessions.is_current(ticket) {
            return Err(AppError::Conflict(
                "El sorteo fue reiniciado mientras se guardaba".to_string(),
            ));
        }
        step(&mut *slot);
        Ok(())
    }

    async fn load_identity(&self, winner: &Winner) -> (WinnerIdentity, bool) {
        let Some(purchase_id) = winner.purchase_id.as_deref() else {
            return (WinnerIdentity::placeholder(), true);
        };
        match self.gateway.fetch_purchase_identity(purchase_id).await {
            Ok(Some(identity)) => (identity, false),
            Ok(None) => (WinnerIdentity::placeholder(), true),
            Err(e) => {
                log::warn!(
                    "Could not load purchase {purchase_id} for coupon {}: {e}",
                    winner.code
                );
                (WinnerIdentity::unavailable(), true)
            }
        }
    }
}

fn csv_cell(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::fake::{FakeGateway, coupon, identity};
    use std::collections::HashSet;
    use std::sync::atomic::Ordering;

    fn service(fake: FakeGateway) -> (DrawService, Arc<FakeGateway>) {
        let fake = Arc::new(fake);
        let svc = DrawService::with_rng(
            fake.clone(),
            DrawConfig::default(),
            StdRng::seed_from_u64(2026),
        );
        (svc, fake)
    }

    fn start(name: &str, k: usize) -> StartDrawRequest {
        StartDrawRequest {
            name: name.to_string(),
            winner_count: Some(k),
        }
    }

    fn three_coupons() -> Vec<Coupon> {
        vec![
            coupon("SKY-001", Some("p1")),
            coupon("SKY-002", Some("p2")),
            coupon("SKY-003", None),
        ]
    }

    fn full_fake() -> FakeGateway {
        FakeGateway::new()
            .with_coupons(three_coupons())
            .with_purchase("p1", identity("Ana Torres"))
            .with_purchase("p2", identity("Luis Rojas"))
    }

    #[tokio::test]
    async fn test_two_spins_produce_two_distinct_winners() {
        let (svc, _) = service(full_fake());
        svc.start(start("Final", 2)).await.unwrap();
        let first = svc.spin().await.unwrap();
        let second = svc.spin().await.unwrap();

        assert!(second.state.complete);
        assert_eq!(second.state.winners.len(), 2);
        let codes: HashSet<_> = second.state.winners.iter().map(|w| &w.code).collect();
        assert_eq!(codes.len(), 2);
        assert_eq!(
            first.frames.last(),
            first.winner.as_ref().map(|w| &w.code)
        );
    }

    #[tokio::test]
    async fn test_identity_or_placeholder_attached() {
        let (svc, _) = service(full_fake());
        svc.start(start("Final", 3)).await.unwrap();
        for _ in 0..3 {
            svc.spin().await.unwrap();
        }
        let state = svc.state().await;
        for w in &state.winners {
            match w.code.as_str() {
                "SKY-001" => assert_eq!(w.identity.full_name, "Ana Torres"),
                "SKY-002" => assert_eq!(w.identity.full_name, "Luis Rojas"),
                _ => {
                    assert_eq!(w.identity.full_name, PLACEHOLDER_NAME);
                    assert_eq!(w.identity.city, NOT_AVAILABLE);
                    assert!(w.placeholder);
                }
            }
        }
    }

    #[tokio::test]
    async fn test_failed_identity_does_not_abort() {
        let fake = full_fake();
        fake.failing_purchases.lock().unwrap().insert("p1".to_string());
        fake.failing_purchases.lock().unwrap().insert("p2".to_string());
        let (svc, _) = service(fake);
        svc.start(start("Final", 3)).await.unwrap();
        for _ in 0..3 {
            assert!(svc.spin().await.unwrap().winner.is_some());
        }
        let state = svc.state().await;
        assert!(state.complete);
        assert!(
            state
                .winners
                .iter()
                .any(|w| w.identity.full_name == UNAVAILABLE_NAME)
        );
    }

    #[tokio::test]
    async fn test_empty_pool_refuses_to_start() {
        let (svc, _) = service(FakeGateway::new());
        let err = svc.start(start("Vacío", 5)).await.unwrap_err();
        assert!(matches!(err, AppError::Draw(DrawError::EmptyPool)));
        assert!(matches!(
            svc.spin().await,
            Err(AppError::Draw(DrawError::NotStarted))
        ));
    }

    #[tokio::test]
    async fn test_exhaustion_is_reported_not_thrown() {
        let (svc, _) = service(full_fake());
        svc.start(start("Grande", 5)).await.unwrap();
        let mut last = None;
        for _ in 0..3 {
            last = Some(svc.spin().await.unwrap());
        }
        let state = last.unwrap().state;
        assert!(state.complete);
        assert!(state.exhausted);
        assert_eq!(state.winners.len(), 3);
        assert_eq!(state.notice.as_deref(), Some(EXHAUSTED_NOTICE));
        assert!(matches!(
            svc.spin().await,
            Err(AppError::Draw(DrawError::AlreadyComplete))
        ));
    }

    #[tokio::test]
    async fn test_restart_refetches_pool() {
        let (svc, fake) = service(full_fake());
        svc.start(start("Uno", 1)).await.unwrap();
        svc.spin().await.unwrap();
        svc.reset().await;
        assert!(svc.state().await.winners.is_empty());

        fake.coupons.lock().unwrap().truncate(1);
        let state = svc.start(start("Dos", 1)).await.unwrap();
        assert_eq!(state.pool_size, 1);
        assert_eq!(fake.coupon_fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_save_persists_then_marks_used() {
        let (svc, fake) = service(full_fake());
        svc.start(start("Final", 2)).await.unwrap();
        assert!(matches!(
            svc.save().await,
            Err(AppError::ValidationError(_))
        ));
        svc.spin().await.unwrap();
        svc.spin().await.unwrap();

        let state = svc.save().await.unwrap();
        assert!(state.saved);
        let persisted = fake.persisted.lock().unwrap();
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].name, "Final");
        assert_eq!(persisted[0].preselected_count, 3);
        assert_eq!(persisted[0].finalists_count, 2);
        let marked = fake.marked.lock().unwrap();
        assert_eq!(marked[0], vec![
            persisted[0].winners[0].code.clone(),
            persisted[0].winners[1].code.clone()
        ]);
    }

    #[tokio::test]
    async fn test_save_retry_resumes_failed_step() {
        let fake = full_fake();
        fake.persist_failures.store(1, Ordering::SeqCst);
        fake.mark_failures.store(1, Ordering::SeqCst);
        let (svc, fake) = service(fake);
        svc.start(start("Final", 1)).await.unwrap();
        svc.spin().await.unwrap();

        let err = svc.save().await.unwrap_err();
        assert!(matches!(err, AppError::Persistence(_)));
        assert_eq!(svc.state().await.winners.len(), 1);

        let err = svc.save().await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(fake.persisted.lock().unwrap().len(), 1);

        assert!(svc.save().await.unwrap().saved);
        assert_eq!(fake.persisted.lock().unwrap().len(), 1);
        assert_eq!(fake.marked.lock().unwrap().len(), 1);
        assert!(matches!(svc.save().await, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_next_moves_back_to_idle() {
        let (svc, _) = service(full_fake());
        svc.start(start("Final", 2)).await.unwrap();
        let spun = svc.spin().await.unwrap();
        assert_eq!(spun.state.phase, DrawPhase::Revealing);
        let state = svc.next().await.unwrap();
        assert_eq!(state.phase, DrawPhase::Idle);
    }

    #[tokio::test]
    async fn test_export_csv() {
        let fake = FakeGateway::new()
            .with_coupons(vec![coupon("SKY-001", Some("p1"))])
            .with_purchase("p1", identity("Torres, Ana"));
        let (svc, _) = service(fake);
        svc.start(start("Final", 1)).await.unwrap();
        svc.spin().await.unwrap();
        let csv = svc.export_csv().await.unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(
            lines[1],
            "1,SKY-001,\"Torres, Ana\",45678912,Lima,ganador@example.com,987654321"
        );
    }

    #[tokio::test]
    async fn test_overlapping_saves_write_once() {
        let (svc, fake) = service(full_fake());
        svc.start(start("Final", 2)).await.unwrap();
        svc.spin().await.unwrap();
        svc.spin().await.unwrap();

        let (first, second) = tokio::join!(svc.save(), svc.save());

        assert!(first.unwrap().saved);
        assert!(matches!(second, Err(AppError::Conflict(_))));
        assert_eq!(fake.persisted.lock().unwrap().len(), 1);
        assert_eq!(fake.marked.lock().unwrap().len(), 1);
        assert!(matches!(svc.save().await, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_save_waits_for_last_identity() {
        let fake = full_fake().with_coupons(vec![coupon("SKY-001", Some("p1"))]);
        let gate = fake.gate_purchase("p1");
        let (svc, fake) = service(fake);
        svc.start(start("Final", 1)).await.unwrap();

        let spin = svc.spin();
        let early_save = async {
            let result = svc.save().await;
            gate.notify_one();
            result
        };
        let (spun, early) = tokio::join!(spin, early_save);

        assert!(matches!(early, Err(AppError::Conflict(_))));
        assert!(fake.persisted.lock().unwrap().is_empty());
        assert_eq!(spun.unwrap().winner.unwrap().identity.full_name, "Ana Torres");

        assert!(svc.save().await.unwrap().saved);
        let persisted = fake.persisted.lock().unwrap();
        assert_eq!(persisted[0].winners[0].identity.full_name, "Ana Torres");
    }

    #[test]
    fn test_csv_cell_escaping() {
        assert_eq!(csv_cell("plain"), "plain");
        assert_eq!(csv_cell("a\"b"), "\"a\"\"b\"");
    }
}
