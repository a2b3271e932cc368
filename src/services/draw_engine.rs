//! Tombola state machine.
//!
//! Selection is uniform and without replacement over a pool fixed at start.
//! The spinning animation is purely cosmetic: [`DrawEngine::spin_frames`]
//! feeds the ticker, [`select_winner`] decides.

use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::HashSet;
use thiserror::Error;

use crate::models::{Coupon, DrawPhase, OwnerType, Winner, WinnerIdentity};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DrawError {
    #[error("No hay cupones elegibles para el sorteo")]
    EmptyPool,

    #[error("La cantidad de ganadores debe ser mayor a cero")]
    InvalidTarget,

    #[error("No hay un sorteo en curso")]
    NotStarted,

    #[error("El sorteo ya terminó")]
    AlreadyComplete,

    #[error("Acción no permitida en la fase {0:?}")]
    InvalidTransition(DrawPhase),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SpinOutcome {
    Selected(Winner),
    /// Nothing left to draw; the session is complete with fewer winners.
    PoolExhausted,
}

/// Uniform pick among coupons whose code has not won yet.
pub fn select_winner<'a, R: Rng + ?Sized>(
    pool: &'a [Coupon],
    winners: &[Winner],
    rng: &mut R,
) -> Option<&'a Coupon> {
    let won: HashSet<&str> = winners.iter().map(|w| w.code.as_str()).collect();
    let remaining: Vec<&Coupon> = pool
        .iter()
        .filter(|c| !won.contains(c.code.as_str()))
        .collect();
    remaining.choose(rng).copied()
}

pub struct DrawEngine<R: Rng> {
    rng: R,
    pool: Vec<Coupon>,
    target: usize,
    winners: Vec<Winner>,
    phase: DrawPhase,
    started: bool,
    exhausted: bool,
}

impl<R: Rng> DrawEngine<R> {
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            pool: Vec::new(),
            target: 0,
            winners: Vec::new(),
            phase: DrawPhase::Idle,
            started: false,
            exhausted: false,
        }
    }

    /// Load the pool and the number of winners wanted.
    ///
    /// Seller coupons and repeated codes never take part.
    pub fn start_draw(&mut self, pool: Vec<Coupon>, target: usize) -> Result<(), DrawError> {
        self.reset();
        if target == 0 {
            return Err(DrawError::InvalidTarget);
        }

        let mut seen = HashSet::new();
        let pool: Vec<Coupon> = pool
            .into_iter()
            .filter(|c| c.owner_type == OwnerType::Buyer)
            .filter(|c| seen.insert(c.code.clone()))
            .collect();
        if pool.is_empty() {
            return Err(DrawError::EmptyPool);
        }

        if target > pool.len() {
            log::warn!(
                "Draw asks for {} winners but only {} coupons are eligible",
                target,
                pool.len()
            );
        }
        self.pool = pool;
        self.target = target;
        self.started = true;
        Ok(())
    }

    /// Pick the next winner. Allowed while idle or while the previous winner
    /// is still being revealed.
    pub fn spin_next(&mut self) -> Result<SpinOutcome, DrawError> {
        if !self.started {
            return Err(DrawError::NotStarted);
        }
        match self.phase {
            DrawPhase::Idle | DrawPhase::Revealing => {}
            DrawPhase::Complete => return Err(DrawError::AlreadyComplete),
            DrawPhase::Spinning => return Err(DrawError::InvalidTransition(self.phase)),
        }

        self.phase = DrawPhase::Spinning;
        let Some(coupon) = select_winner(&self.pool, &self.winners, &mut self.rng).cloned()
        else {
            self.exhausted = true;
            self.phase = DrawPhase::Complete;
            log::warn!(
                "Draw pool exhausted with {} of {} winners",
                self.winners.len(),
                self.target
            );
            return Ok(SpinOutcome::PoolExhausted);
        };

        let winner = Winner {
            position: self.winners.len() + 1,
            coupon_id: coupon.id,
            code: coupon.code,
            purchase_id: coupon.purchase_id,
            identity: WinnerIdentity::placeholder(),
            placeholder: true,
        };
        self.winners.push(winner.clone());

        self.phase = if self.winners.len() >= self.target {
            DrawPhase::Complete
        } else if self.remaining() == 0 {
            self.exhausted = true;
            DrawPhase::Complete
        } else {
            DrawPhase::Revealing
        };
        Ok(SpinOutcome::Selected(winner))
    }

    /// Done revealing; wait for the operator.
    pub fn acknowledge(&mut self) -> Result<(), DrawError> {
        match self.phase {
            DrawPhase::Revealing => {
                self.phase = DrawPhase::Idle;
                Ok(())
            }
            DrawPhase::Complete => Err(DrawError::AlreadyComplete),
            other => Err(DrawError::InvalidTransition(other)),
        }
    }

    /// Replace the placeholder identity of an already drawn code.
    pub fn attach_identity(&mut self, code: &str, identity: WinnerIdentity, placeholder: bool) {
        if let Some(winner) = self.winners.iter_mut().find(|w| w.code == code) {
            winner.identity = identity;
            winner.placeholder = placeholder;
        }
    }

    /// Random codes for the ticker; never changes the outcome.
    pub fn spin_frames(&mut self, count: usize) -> Vec<String> {
        let won: HashSet<&str> = self.winners.iter().map(|w| w.code.as_str()).collect();
        let remaining: Vec<&Coupon> = self
            .pool
            .iter()
            .filter(|c| !won.contains(c.code.as_str()))
            .collect();
        if remaining.is_empty() {
            return Vec::new();
        }
        (0..count)
            .map(|_| remaining[self.rng.gen_range(0..remaining.len())].code.clone())
            .collect()
    }

    /// Forget the pool and all winners.
    pub fn reset(&mut self) {
        self.pool.clear();
        self.winners.clear();
        self.target = 0;
        self.phase = DrawPhase::Idle;
        self.started = false;
        self.exhausted = false;
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_complete(&self) -> bool {
        self.phase == DrawPhase::Complete
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn phase(&self) -> DrawPhase {
        self.phase
    }

    pub fn winners(&self) -> &[Winner] {
        &self.winners
    }

    pub fn target(&self) -> usize {
        self.target
    }

    pub fn pool_size(&self) -> usize {
        self.pool.len()
    }

    pub fn remaining(&self) -> usize {
        self.pool.len() - self.winners.len()
    }
}
