//! Trading volume of one user selling USDC on the USDC/WETH pool.
//!
//! Each record carries three fields of one swap transaction: the USDC
//! `Transfer.from`, the pool's `Swap.amount0` and `Swap.recipient`. Every
//! record must come from the bound user; the circuit outputs the summed
//! `amount0` and the number of swaps.

use alloy_primitives::{address, b256, Address, B256};

use receipt_zk_core::circuit::{Allocation, AppCircuit, Assignment};
use receipt_zk_core::error::Result;
use receipt_zk_core::pipeline::PipelineBuilder;
use receipt_zk_core::predicate::{Operand, Predicate};
use receipt_zk_core::receipt::{FieldReference, ReceiptRecord};
use receipt_zk_core::source::{Fixture, FixtureReceipt};

use super::{address_topic, amount, log, DemoApp};

pub const USDC: Address = address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
pub const USDC_POOL: Address = address!("88e6a0c2ddd26feeb64f039a2c41296fcb3f5640");
pub const TRANSFER_EVENT: B256 =
    b256!("ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef");
pub const SWAP_EVENT: B256 =
    b256!("c42079f94a6350d7e6235f29174924f928cc2ac818eb64fed8004e115fbcca67");

pub const USER: Address = address!("aefb31e9eeee2822f4c1cbc13b70948b0b5c0b3c");
pub const SAMPLE_TX: B256 =
    b256!("53b37ec7975d217295f4bdadf8043b261fc49dccc16da9b9fc8b9530845a5794");
pub const SAMPLE_BLOCK: u64 = 19_253_474;

const WETH: Address = address!("c02aaa39b223fe8d0a0e5c4f27ead9083c756cc2");
const ROUTER: Address = address!("3fc91a3afd70395cd496c647d5a6cc9d4b2b7fad");
const WITHDRAWAL_EVENT: B256 =
    b256!("7fcf532c15f0a6db0bd6d0e038bea71d30d808c7d98cb3bf7268a95bf5081b65");

#[derive(Debug, Clone, Copy, Default)]
pub struct TradingVolume;

impl AppCircuit for TradingVolume {
    fn allocate(&self) -> Allocation {
        Allocation::receipts(32)
    }

    fn define(&self, b: &mut PipelineBuilder) -> Result<()> {
        let user = b.constant("UserAddr");
        let usdc = Operand::literal(USDC.into_word());
        let pool = Operand::literal(USDC_POOL.into_word());
        let transfer = Operand::literal(TRANSFER_EVENT);
        let swap = Operand::literal(SWAP_EVENT);

        let receipts = b.receipts();
        b.assert_each(
            receipts,
            Predicate::all([
                Predicate::eq(Operand::contract(0), usdc),
                Predicate::eq(Operand::event_id(0), transfer),
                Predicate::eq(Operand::contract(1), pool.clone()),
                Predicate::eq(Operand::event_id(1), swap.clone()),
                Predicate::eq(Operand::contract(2), pool),
                Predicate::eq(Operand::event_id(2), swap),
                Predicate::eq(Operand::value(0), user.clone()),
                Predicate::eq(Operand::value(2), user),
            ]),
        );
        b.sum(receipts, Operand::value(1));
        b.count(receipts);
        Ok(())
    }
}

impl DemoApp for TradingVolume {
    fn assignment(&self) -> Assignment {
        Assignment::new().with("UserAddr", USER.into_word())
    }

    fn queries(&self, tx_hash: B256) -> Result<Vec<ReceiptRecord>> {
        Ok(vec![ReceiptRecord::new(
            tx_hash,
            vec![
                // USDC.Transfer.from
                FieldReference::topic(2, 1)?,
                // USDCPool.Swap.amount0
                FieldReference::data(3, 0)?,
                // USDCPool.Swap.recipient
                FieldReference::topic(3, 2)?,
            ],
        )?])
    }

    fn sample_tx(&self) -> B256 {
        SAMPLE_TX
    }

    fn sample_fixture(&self) -> Fixture {
        Fixture {
            chain_id: 1,
            receipts: vec![FixtureReceipt {
                tx_hash: SAMPLE_TX,
                block_number: SAMPLE_BLOCK,
                logs: vec![
                    log(
                        WETH,
                        vec![TRANSFER_EVENT, address_topic(USDC_POOL), address_topic(ROUTER)],
                        &[amount(48_000_000_000_000_000)],
                    ),
                    log(
                        WETH,
                        vec![WITHDRAWAL_EVENT, address_topic(ROUTER)],
                        &[amount(48_000_000_000_000_000)],
                    ),
                    log(
                        USDC,
                        vec![TRANSFER_EVENT, address_topic(USER), address_topic(USDC_POOL)],
                        &[amount(123_456)],
                    ),
                    log(
                        USDC_POOL,
                        vec![SWAP_EVENT, address_topic(ROUTER), address_topic(USER)],
                        &[amount(123_456), B256::ZERO, B256::ZERO, B256::ZERO, B256::ZERO],
                    ),
                ],
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use receipt_zk_core::circuit::CircuitDescriptor;
    use receipt_zk_core::error::ReceiptZkError;
    use receipt_zk_core::stream::DataStream;

    fn resolved(fixture: &Fixture) -> ReceiptRecord {
        let receipt = &fixture.receipts[0];
        let logs: Vec<_> = receipt
            .logs
            .iter()
            .map(|l| {
                alloy_primitives::Log::new_unchecked(l.address, l.topics.clone(), l.data.clone())
            })
            .collect();
        TradingVolume.queries(SAMPLE_TX).unwrap()[0]
            .resolve(receipt.block_number, &logs)
            .unwrap()
    }

    fn stream(descriptor: &CircuitDescriptor, record: ReceiptRecord) -> DataStream {
        let mut stream = descriptor.new_stream();
        stream.append(record).unwrap();
        stream
    }

    #[test]
    fn test_sample_volume() {
        let descriptor = CircuitDescriptor::new(&TradingVolume).unwrap();
        let record = resolved(&TradingVolume.sample_fixture());
        assert_eq!(record.fields[1].value, amount(0x1e240));

        let eval = descriptor
            .check(&stream(&descriptor, record), &TradingVolume.assignment())
            .unwrap();
        assert_eq!(eval.outputs, vec![amount(123_456), amount(1)]);
    }

    #[test]
    fn test_other_user_fails_assertion() {
        let descriptor = CircuitDescriptor::new(&TradingVolume).unwrap();
        let record = resolved(&TradingVolume.sample_fixture());
        let other = Assignment::new().with("UserAddr", ROUTER.into_word());
        let err = descriptor
            .check(&stream(&descriptor, record), &other)
            .unwrap_err();
        assert!(matches!(err, ReceiptZkError::AssertionFailed { stage: 0, slot: 0 }));
    }
}
