//! Decoding compiled instructions and exact comparison against reference instructions

use solana_sdk::instruction::{AccountMeta, CompiledInstruction, Instruction};
use solana_sdk::message::Message;
use solana_sdk::pubkey::Pubkey;

use crate::shared::errors::RelayError;

pub fn is_signer_index(message: &Message, index: usize) -> bool {
    index < message.header.num_required_signatures as usize
}

pub fn is_writable_index(message: &Message, index: usize) -> bool {
    let header = &message.header;
    let signed = header.num_required_signatures as usize;
    if index < signed {
        index < signed.saturating_sub(header.num_readonly_signed_accounts as usize)
    } else {
        index < message
            .account_keys
            .len()
            .saturating_sub(header.num_readonly_unsigned_accounts as usize)
    }
}

/// Rebuild instruction `index` of `message` with message-level account privileges
pub fn decode_instruction(message: &Message, index: usize) -> Result<Instruction, RelayError> {
    let compiled = message.instructions.get(index).ok_or_else(|| {
        RelayError::MalformedTransaction(format!("instruction {} is missing", index))
    })?;
    let key_at = |i: u8| {
        message.account_keys.get(i as usize).copied().ok_or_else(|| {
            RelayError::MalformedTransaction(format!(
                "instruction {} references account index {} out of range",
                index, i
            ))
        })
    };

    let program_id = key_at(compiled.program_id_index)?;
    let accounts = compiled
        .accounts
        .iter()
        .map(|&i| {
            Ok(AccountMeta {
                pubkey: key_at(i)?,
                is_signer: is_signer_index(message, i as usize),
                is_writable: is_writable_index(message, i as usize),
            })
        })
        .collect::<Result<Vec<_>, RelayError>>()?;

    Ok(Instruction {
        program_id,
        accounts,
        data: compiled.data.clone(),
    })
}

/// Compile `instruction` into the index space of `message`'s account keys
pub fn compile_instruction(message: &Message, instruction: &Instruction) -> Result<CompiledInstruction, Pubkey> {
    let position = |key: &Pubkey| {
        message
            .account_keys
            .iter()
            .position(|k| k == key)
            .map(|i| i as u8)
            .ok_or(*key)
    };

    Ok(CompiledInstruction {
        program_id_index: position(&instruction.program_id)?,
        accounts: instruction
            .accounts
            .iter()
            .map(|meta| position(&meta.pubkey))
            .collect::<Result<Vec<_>, _>>()?,
        data: instruction.data.clone(),
    })
}

/// Require instruction `index` of `message` to be exactly `reference`.
///
/// Legacy messages carry signer/writable flags per account, not per
/// instruction, so privileges are compared as "the message grants at least
/// what the reference asks for"; program, account order and data must be
/// identical on the wire.
pub fn expect_exact(message: &Message, index: usize, reference: &Instruction) -> Result<(), RelayError> {
    let submitted = message.instructions.get(index).ok_or_else(|| {
        RelayError::MalformedTransaction(format!("instruction {} is missing", index))
    })?;
    let expected = compile_instruction(message, reference).map_err(|key| {
        RelayError::InstructionMismatch(format!("{} is not referenced by the transaction", key))
    })?;

    if submitted == &expected {
        for (position, meta) in reference.accounts.iter().enumerate() {
            let i = expected.accounts[position] as usize;
            if meta.is_signer && !is_signer_index(message, i) {
                return Err(RelayError::InstructionMismatch(format!(
                    "account {} ({}) must sign",
                    position, meta.pubkey
                )));
            }
            if meta.is_writable && !is_writable_index(message, i) {
                return Err(RelayError::InstructionMismatch(format!(
                    "account {} ({}) must be writable",
                    position, meta.pubkey
                )));
            }
        }
        return Ok(());
    }

    let describe = |i: u8| {
        message
            .account_keys
            .get(i as usize)
            .map(|k| k.to_string())
            .unwrap_or_else(|| format!("<index {}>", i))
    };

    let reason = if submitted.program_id_index != expected.program_id_index {
        format!(
            "program: expected {}, found {}",
            reference.program_id,
            describe(submitted.program_id_index)
        )
    } else if submitted.accounts.len() != expected.accounts.len() {
        format!(
            "expected {} accounts, found {}",
            expected.accounts.len(),
            submitted.accounts.len()
        )
    } else if let Some(position) = submitted
        .accounts
        .iter()
        .zip(&expected.accounts)
        .position(|(a, b)| a != b)
    {
        format!(
            "account {}: expected {}, found {}",
            position,
            describe(expected.accounts[position]),
            describe(submitted.accounts[position])
        )
    } else {
        format!("data: expected {:?}, found {:?}", expected.data, submitted.data)
    };

    Err(RelayError::InstructionMismatch(reason))
}
