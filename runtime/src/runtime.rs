// Copyright (c) 2024 Botho Foundation

use nuoi_common::{logger::TraceTime, Clock, UnixTimestamp};
use nuoi_crypto_address::AddressDeriver;
use nuoi_crypto_keys::Pubkey;
use nuoi_ledger_db::{StateStore, StoreError, Version, WriteBatch};
use nuoi_protocol::{
    process, Account, Effects, InstructionBuilder, InstructionContext, ProtocolError,
    ProtocolParams, Receipt, SignedInstruction, Transfer,
};
use tracing::{debug, info, warn};

/// Map a storage failure into the protocol taxonomy.
pub(crate) fn store_error(e: StoreError) -> ProtocolError {
    match e {
        StoreError::Conflict {
            address,
            expected,
            found,
        } => ProtocolError::Conflict {
            address,
            expected,
            found,
        },
        StoreError::Corrupt { address, reason } => ProtocolError::Corrupt { address, reason },
        StoreError::Database(reason) | StoreError::Io(reason) => ProtocolError::Store(reason),
    }
}

/// A processed instruction waiting to be committed.
#[derive(Debug, Clone)]
pub struct StagedTransaction {
    instruction: &'static str,
    signer: Pubkey,
    receipt: Pubkey,
    now: UnixTimestamp,
    reads: Vec<(Pubkey, Version)>,
    effects: Effects,
}

impl StagedTransaction {
    pub fn instruction(&self) -> &'static str {
        self.instruction
    }

    pub fn effects(&self) -> &Effects {
        &self.effects
    }
}

/// What a committed instruction did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub instruction: &'static str,
    pub signer: Pubkey,
    /// Address of the replay marker left by this submission.
    pub receipt: Pubkey,
    pub committed_at: UnixTimestamp,
    pub written: Vec<Pubkey>,
    pub transfers: Vec<Transfer>,
}

pub struct Runtime<S, C> {
    store: S,
    clock: C,
    deriver: AddressDeriver,
    params: ProtocolParams,
}

impl<S: StateStore, C: Clock> Runtime<S, C> {
    pub fn new(store: S, clock: C, program_id: Pubkey, params: ProtocolParams) -> Self {
        Self {
            store,
            clock,
            deriver: AddressDeriver::new(program_id),
            params,
        }
    }

    pub fn program_id(&self) -> &Pubkey {
        self.deriver.program_id()
    }

    pub fn deriver(&self) -> &AddressDeriver {
        &self.deriver
    }

    pub fn builder(&self) -> InstructionBuilder {
        InstructionBuilder::new(self.deriver)
    }

    pub fn params(&self) -> &ProtocolParams {
        &self.params
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn now(&self) -> UnixTimestamp {
        self.clock.now()
    }

    /// Read and decode one account with its version.
    pub(crate) fn load(
        &self,
        address: &Pubkey,
    ) -> Result<(Version, Option<Account>), ProtocolError> {
        match self.store.get(address).map_err(store_error)? {
            Some(entry) => Ok((entry.version, Some(Account::decode(address, &entry.data)?))),
            None => Ok((0, None)),
        }
    }

    /// Authenticate, read and process `signed` without committing.
    pub fn stage(&self, signed: &SignedInstruction) -> Result<StagedTransaction, ProtocolError> {
        let name = signed.instruction.name();
        if let Err(e) = signed.verify(self.program_id()) {
            warn!(instruction = name, signer = %signed.signer, "Rejected unsigned submission");
            return Err(e);
        }
        signed.instruction.validate(&self.params)?;

        let receipt = signed.receipt_address();
        if let (_, Some(_)) = self.load(&receipt)? {
            return Err(ProtocolError::Replayed { digest: receipt });
        }

        let addresses = signed.instruction.accounts(&self.deriver, &signed.signer)?;
        let mut reads = Vec::with_capacity(addresses.len() + 1);
        let mut loaded = Vec::with_capacity(addresses.len());
        for address in addresses {
            let (version, account) = self.load(&address)?;
            reads.push((address, version));
            loaded.push((address, account));
        }
        reads.push((receipt, 0));

        let now = self.clock.now();
        let mut ctx =
            InstructionContext::new(signed.signer, now, &self.params, &self.deriver, loaded);
        process(&signed.instruction, &mut ctx)?;
        let mut effects = ctx.into_effects();
        effects.writes.push((
            receipt,
            Account::Receipt(Receipt {
                signer: signed.signer,
                applied_at: now,
            }),
        ));

        debug!(
            instruction = name,
            signer = %signed.signer,
            reads = reads.len(),
            writes = effects.writes.len(),
            "Staged instruction"
        );

        Ok(StagedTransaction {
            instruction: name,
            signer: signed.signer,
            receipt,
            now,
            reads,
            effects,
        })
    }

    /// Apply `staged` if nothing it read has changed since.
    pub fn commit(&self, staged: StagedTransaction) -> Result<Outcome, ProtocolError> {
        let mut batch = WriteBatch::new();
        for (address, version) in &staged.reads {
            batch.expect(*address, *version);
        }
        for (address, account) in &staged.effects.writes {
            batch.put(*address, account.encode()?);
        }

        if let Err(e) = self.store.commit(&batch) {
            let err = store_error(e);
            warn!(
                instruction = staged.instruction,
                signer = %staged.signer,
                error = %err,
                "Commit rejected"
            );
            return Err(err);
        }

        info!(
            instruction = staged.instruction,
            signer = %staged.signer,
            writes = staged.effects.writes.len(),
            transfers = staged.effects.transfers.len(),
            "Committed instruction"
        );

        Ok(Outcome {
            instruction: staged.instruction,
            signer: staged.signer,
            receipt: staged.receipt,
            committed_at: staged.now,
            written: staged.effects.writes.iter().map(|(a, _)| *a).collect(),
            transfers: staged.effects.transfers,
        })
    }

    /// Stage and commit in one step.
    pub fn submit(&self, signed: &SignedInstruction) -> Result<Outcome, ProtocolError> {
        let _timer = TraceTime::new("submit");
        let staged = match self.stage(signed) {
            Ok(staged) => staged,
            Err(e) => {
                debug!(
                    instruction = signed.instruction.name(),
                    signer = %signed.signer,
                    kind = %e.kind(),
                    error = %e,
                    "Instruction rejected"
                );
                return Err(e);
            }
        };
        self.commit(staged)
    }
}
