//! Transfers of WETH/DEAI and swaps on their Uniswap pool in one transaction.
//!
//! Filters the receipt stream into transfer and swap streams, asserts every
//! record in each, and outputs how many of each were seen.

use alloy_primitives::{address, b256, Address, B256};

use receipt_zk_core::circuit::{Allocation, AppCircuit, Assignment};
use receipt_zk_core::error::Result;
use receipt_zk_core::pipeline::PipelineBuilder;
use receipt_zk_core::predicate::{Operand, Predicate};
use receipt_zk_core::receipt::{FieldReference, ReceiptRecord};
use receipt_zk_core::source::{Fixture, FixtureReceipt};

use super::{address_topic, amount, log, DemoApp};

pub const WETH: Address = address!("c02aaa39b223fe8d0a0e5c4f27ead9083c756cc2");
pub const DEAI: Address = address!("1495bc9e44af1f8bcb62278d2bec4540cf0c05ea");
pub const POOL: Address = address!("1385fc1fe0418ea0b4fcf7adc61fc7535ab7f80d");
pub const TRANSFER_EVENT: B256 =
    b256!("ddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef");
pub const SWAP_EVENT: B256 =
    b256!("c42079f94a6350d7e6235f29174924f928cc2ac818eb64fed8004e115fbcca67");

pub const SAMPLE_TX: B256 =
    b256!("cd88108ce4961294b4544342946f4f9696fd734fbc1e1452834c4923423e514a");
pub const SAMPLE_BLOCK: u64 = 18_446_788;

const ROUTER: Address = address!("e592427a0aece92de3edee1f18e0157c05861564");
const TRADER: Address = address!("74bed4ce9d183f69dbb51a394fff48ed861523e1");

#[derive(Debug, Clone, Copy, Default)]
pub struct UniswapPrime;

impl AppCircuit for UniswapPrime {
    fn allocate(&self) -> Allocation {
        Allocation::receipts(32)
    }

    fn define(&self, b: &mut PipelineBuilder) -> Result<()> {
        let weth = b.constant("WETHAddress");
        let deai = b.constant("DEAIAddress");
        let pool = b.constant("UniswapPool");
        let transfer = b.constant("TransferEventID");
        let swap = b.constant("SwapEventID");

        let transfers = b.filter(
            b.receipts(),
            Predicate::one_of(Operand::contract(0), [weth, deai])
                .and(Predicate::eq(Operand::event_id(0), transfer)),
        );
        b.assert_each(transfers, Predicate::TRUE);

        let swaps = b.filter(
            b.receipts(),
            Predicate::eq(Operand::contract(0), pool)
                .and(Predicate::eq(Operand::event_id(0), swap)),
        );
        b.assert_each(swaps, Predicate::TRUE);

        b.count(transfers);
        b.count(swaps);
        Ok(())
    }
}

impl DemoApp for UniswapPrime {
    fn assignment(&self) -> Assignment {
        Assignment::new()
            .with("WETHAddress", WETH.into_word())
            .with("DEAIAddress", DEAI.into_word())
            .with("UniswapPool", POOL.into_word())
            .with("TransferEventID", TRANSFER_EVENT)
            .with("SwapEventID", SWAP_EVENT)
    }

    fn queries(&self, tx_hash: B256) -> Result<Vec<ReceiptRecord>> {
        Ok(vec![
            // WETH Transfer: from, to
            ReceiptRecord::new(
                tx_hash,
                vec![FieldReference::topic(0, 1)?, FieldReference::topic(0, 2)?],
            )?,
            // DEAI Transfer: from, to
            ReceiptRecord::new(
                tx_hash,
                vec![FieldReference::topic(1, 1)?, FieldReference::topic(1, 2)?],
            )?,
            // Swap: recipient
            ReceiptRecord::new(tx_hash, vec![FieldReference::topic(2, 2)?])?,
        ])
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
                        vec![TRANSFER_EVENT, address_topic(POOL), address_topic(ROUTER)],
                        &[amount(250_000_000_000_000_000)],
                    ),
                    log(
                        DEAI,
                        vec![TRANSFER_EVENT, address_topic(TRADER), address_topic(POOL)],
                        &[amount(1_200_000_000_000_000_000)],
                    ),
                    log(
                        POOL,
                        vec![SWAP_EVENT, address_topic(ROUTER), address_topic(ROUTER)],
                        &[
                            amount(1_200_000_000_000_000_000),
                            B256::ZERO,
                            B256::ZERO,
                            B256::ZERO,
                            B256::ZERO,
                        ],
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
    use receipt_zk_core::config::SessionConfig;
    use receipt_zk_core::querier::ReceiptQuerier;
    use receipt_zk_core::source::FixtureSource;

    #[tokio::test]
    async fn test_sample_transaction_solves() {
        let dir = tempfile::tempdir().unwrap();
        let app = UniswapPrime;
        let descriptor = CircuitDescriptor::new(&app).unwrap();
        let source = FixtureSource::from_fixture(app.sample_fixture()).unwrap();
        let config = SessionConfig::new(1, dir.path().join("out"), dir.path().join("srs"));

        let mut querier = ReceiptQuerier::new(config, source);
        for record in app.queries(SAMPLE_TX).unwrap() {
            querier.add_receipt(record).unwrap();
        }
        let input = querier
            .build_circuit_input(&descriptor, &app.assignment())
            .await
            .unwrap();
        assert_eq!(input.receipts[0].block_number, Some(SAMPLE_BLOCK));
        assert_eq!(input.receipts[2].fields[0].value, address_topic(ROUTER));

        let eval = descriptor
            .check(&input.stream().unwrap(), &app.assignment())
            .unwrap();
        assert_eq!(eval.filtered, vec![vec![0, 1], vec![2]]);
        assert_eq!(eval.outputs, vec![amount(2), amount(1)]);
    }

    #[test]
    fn test_assignment_binds_every_constant() {
        let descriptor = CircuitDescriptor::new(&UniswapPrime).unwrap();
        descriptor.check_assignment(&UniswapPrime.assignment()).unwrap();
        assert_eq!(descriptor.allocation().max_receipts, 32);
    }
}
