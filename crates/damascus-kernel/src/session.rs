//! A billet plus the workflow around it: policy checks, undo and reset.

use std::time::Instant;

use crate::billet::Billet;
use crate::config::{BilletConfig, Settings};
use crate::error::{BilletError, Result};
use crate::history::{param_map, OperationRecord};
use crate::ops::Operation;
use crate::report::{Diagnostics, OperationReport};

const UNDO_OPERATION: &str = "undo";

/// Owns the billet for one patterning session.
///
/// Undo rebuilds the billet from its configuration and replays every
/// operation but the last. Operators are deterministic, so the replayed
/// geometry matches what was there before the undone call. The history
/// is carried over unchanged and gains an `undo` record.
#[derive(Debug, Clone)]
pub struct Session {
    config: BilletConfig,
    settings: Settings,
    billet: Billet,
    applied: Vec<Operation>,
    diagnostics: Diagnostics,
}

impl Session {
    /// Build a fresh billet from `config`.
    pub fn new(config: BilletConfig, settings: Settings) -> Result<Self> {
        settings.validate()?;
        let billet = Billet::from_config(&config)?;
        let mut diagnostics = Diagnostics::new();
        settings
            .plate
            .check("billet", config.width, config.length, &mut diagnostics);
        Ok(Self {
            config,
            settings,
            billet,
            applied: Vec::new(),
            diagnostics,
        })
    }

    /// Current billet.
    pub fn billet(&self) -> &Billet {
        &self.billet
    }

    /// Mutable billet, for exports that append to its history.
    ///
    /// Operators called directly on it bypass the session: they are not
    /// tracked by [`Session::operations`] and are not replayed by
    /// [`Session::undo`]. Use [`Session::apply`] for geometry changes.
    pub fn billet_mut(&mut self) -> &mut Billet {
        &mut self.billet
    }

    /// Billet configuration.
    pub fn config(&self) -> &BilletConfig {
        &self.config
    }

    /// Active settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Operations applied so far, oldest first.
    pub fn operations(&self) -> &[Operation] {
        &self.applied
    }

    /// Notes produced while creating the billet.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Apply an operation.
    ///
    /// With `session.require_forge_before_twist` set, a twist on an
    /// unforged billet fails with [`BilletError::ForgeRequired`].
    pub fn apply(&mut self, operation: Operation) -> Result<OperationReport> {
        if matches!(operation, Operation::Twist(_))
            && self.settings.session.require_forge_before_twist
            && !self.billet.is_forged()
        {
            tracing::warn!("twist attempted before forging");
            return Err(BilletError::ForgeRequired);
        }
        let report = operation.apply(&mut self.billet, &self.settings)?;
        self.applied.push(operation);
        Ok(report)
    }

    /// Remove the last operation and return it.
    ///
    /// The history keeps every earlier record, including exports, and ends
    /// with an `undo` record whose target is the undone operation.
    pub fn undo(&mut self) -> Result<Operation> {
        let started = Instant::now();
        let keep = self
            .applied
            .len()
            .checked_sub(1)
            .ok_or(BilletError::NothingToUndo)?;
        let mut billet = self.replay(&self.applied[..keep])?;
        let undone = self.applied.pop().ok_or(BilletError::NothingToUndo)?;

        let mut history = self.billet.take_history();
        history.push(
            OperationRecord::new(
                UNDO_OPERATION,
                param_map(&[("undone_index", keep as f64)]),
                started.elapsed().as_secs_f64(),
                param_map(&[("remaining_operations", keep as f64)]),
            )
            .with_target(undone.name()),
        );
        billet.set_history(history);
        self.billet = billet;

        tracing::info!(operation = undone.name(), remaining = keep, "undid operation");
        Ok(undone)
    }

    /// Discard every operation and start from a fresh billet.
    pub fn reset(&mut self) -> Result<()> {
        self.billet = Billet::from_config(&self.config)?;
        self.applied.clear();
        tracing::info!("session reset");
        Ok(())
    }

    fn replay(&self, operations: &[Operation]) -> Result<Billet> {
        let mut billet = Billet::from_config(&self.config)?;
        for operation in operations {
            operation.apply(&mut billet, &self.settings)?;
        }
        Ok(billet)
    }
}
