use std::sync::Arc;

use regspace_runtime::{MemoryBus, RegisterEngine, RuntimeError, Transaction};
use regspace_schema::{resolve_str, ResolveOptions};

const DOC: &str = r#"
- name: soc
  addressBlocks:
    - name: uart
      offset: 0x1000
      registers:
        - name: CTRL
          fields:
            - {name: EN, bits: "[0]"}
            - {name: MODE, bits: "[7:4]"}
            - {name: START, bits: "[8]", access: write-only}
        - name: STATUS
          access: read-only
          fields:
            - {name: BUSY, bits: "[0]"}
        - name: ISR
          access: read-write-1-to-clear
          fields:
            - {name: FLAGS, bits: "[3:0]"}
        - name: ICR
          access: write-1-to-clear
          fields:
            - {name: FLAGS, bits: "[3:0]"}
        - name: TXDATA
          access: write-only
          size: 8
        - name: CFG
          resetValue: 0x0
          fields:
            - {name: DIV, bits: "[15:0]", resetValue: 0x1A}
            - {name: PAR, bits: "[17:16]", resetValue: 2}
    - name: dma
      offset: 0x100
      registers:
        - name: CH
          count: 4
          stride: 16
          registers:
            - name: CTRL
            - name: LEN
"#;

fn engine() -> RegisterEngine<Arc<MemoryBus>> {
    let model = resolve_str(DOC, &ResolveOptions::default()).unwrap();
    RegisterEngine::new(Arc::new(model), Arc::new(MemoryBus::new()))
}

#[test]
fn read_modify_write() {
    let engine = engine();
    let ctrl = engine.register("uart.CTRL").unwrap();
    engine.transport().poke(0x1000, 0xF01);
    engine.write_field(&ctrl, "MODE", 0x5).unwrap();
    assert_eq!(engine.transport().peek(0x1000), 0xF51);
    assert_eq!(
        engine.transport().transactions(),
        vec![
            Transaction::Read { address: 0x1000, word: 0xF01 },
            Transaction::Write { address: 0x1000, word: 0xF51 },
        ]
    );
    assert_eq!(engine.read_field(&ctrl, "MODE").unwrap(), 0x5);
}

#[test]
fn read_only_field_write_touches_nothing() {
    let engine = engine();
    let status = engine.register("soc.uart.STATUS").unwrap();
    let err = engine.write_field(&status, "BUSY", 1).unwrap_err();
    assert!(err.is_access_violation());
    let err = engine.write(&status, 1).unwrap_err();
    assert!(err.is_access_violation());
    assert!(engine.transport().transactions().is_empty());
}

#[test]
fn write_one_to_clear() {
    let engine = engine();
    let isr = engine.register("uart.ISR").unwrap();
    engine.transport().poke(isr.address(), 0b0111);
    engine.write_field(&isr, "FLAGS", 0b0100).unwrap();
    assert_eq!(engine.transport().peek(isr.address()), 0b0011);
}

#[test]
fn write_one_to_clear_without_read() {
    let model = resolve_str(DOC, &ResolveOptions::default()).unwrap();
    let icr_address = model.find_register("uart.ICR").unwrap().address();
    let bus = MemoryBus::new()
        .with_word(icr_address, 0b1111)
        .with_clear_on_write(icr_address);
    let engine = RegisterEngine::new(Arc::new(model), Arc::new(bus));
    let icr = engine.register("uart.ICR").unwrap();

    // The register cannot be read, so only the ones to clear go out.
    engine.write_field(&icr, "FLAGS", 0b0001).unwrap();
    assert_eq!(
        engine.transport().transactions(),
        vec![Transaction::Write { address: icr_address, word: 0b0001 }]
    );
    assert_eq!(engine.transport().peek(icr_address), 0b1110);

    engine.write_field(&icr, "FLAGS", 0b0100).unwrap();
    assert_eq!(engine.transport().peek(icr_address), 0b1010);
    assert!(engine.read_field(&icr, "FLAGS").unwrap_err().is_access_violation());
}

#[test]
fn field_read_on_write_only_register_is_refused() {
    let model = resolve_str(
        "- name: soc\n  addressBlocks:\n    - name: b\n      offset: 0\n      registers:\n        - name: CMD\n          access: write-only\n          fields:\n            - {name: ARG, bits: \"[7:0]\", access: read-write}\n",
        &ResolveOptions::default(),
    )
    .unwrap();
    let engine = RegisterEngine::new(Arc::new(model), Arc::new(MemoryBus::new()));
    let cmd = engine.register("b.CMD").unwrap();
    assert!(engine.read(&cmd).unwrap_err().is_access_violation());
    assert!(engine.read_field(&cmd, "ARG").unwrap_err().is_access_violation());
    assert!(engine.transport().transactions().is_empty());
}

#[test]
fn pulse_field_ignores_current_word() {
    let engine = engine();
    let ctrl = engine.register("uart.CTRL").unwrap();
    engine.transport().poke(0x1000, 0xF1);
    engine.write_field(&ctrl, "START", 1).unwrap();
    assert_eq!(engine.transport().peek(0x1000), 0x100);
    assert_eq!(engine.transport().transactions().len(), 1);
    assert!(engine.read_field(&ctrl, "START").unwrap_err().is_access_violation());
}

#[test]
fn value_range_checked_before_bus() {
    let engine = engine();
    let ctrl = engine.register("uart.CTRL").unwrap();
    let tx = engine.register("uart.TXDATA").unwrap();
    assert!(matches!(
        engine.write_field(&ctrl, "MODE", 0x10),
        Err(RuntimeError::ValueOutOfRange { .. })
    ));
    assert!(matches!(
        engine.write(&tx, 0x100),
        Err(RuntimeError::ValueOutOfRange { width: 8, .. })
    ));
    engine.write(&tx, 0xFF).unwrap();
    assert!(engine.read(&tx).unwrap_err().is_access_violation());
    assert_eq!(engine.transport().transactions().len(), 1);
}

#[test]
fn indexed_array_access() {
    let engine = engine();
    let addresses: Vec<u64> = (0..4)
        .map(|i| engine.array("dma.CH", i).unwrap().register("CTRL").unwrap().address())
        .collect();
    assert_eq!(addresses, vec![0x100, 0x110, 0x120, 0x130]);

    let len = engine.array("soc.dma.CH", 2).unwrap().register("LEN").unwrap();
    assert_eq!(len.path(), "soc.dma.CH_2_LEN");
    engine.write(&len, 64).unwrap();
    assert_eq!(engine.transport().peek(0x124), 64);

    // Computed handles agree with the expanded model.
    assert_eq!(len, engine.register("dma.CH_2_LEN").unwrap());

    assert!(matches!(
        engine.array("dma.CH", 4),
        Err(RuntimeError::IndexOutOfRange { count: 4, .. })
    ));
    assert!(matches!(
        engine.array("dma.NOPE", 0),
        Err(RuntimeError::UnknownArray { .. })
    ));
}

#[test]
fn reset_values() {
    let engine = engine();
    let cfg = engine.register("uart.CFG").unwrap();
    assert_eq!(engine.reset_value(&cfg), 0);
    let ctrl = engine.register("uart.CTRL").unwrap();
    assert_eq!(engine.reset_value(&ctrl), 0);

    let model = resolve_str(
        "- name: m\n  addressBlocks:\n    - name: b\n      offset: 0\n      registers:\n        - name: R\n          fields:\n            - {name: A, bits: \"[3:0]\", reset: 0xA}\n            - {name: B, bits: \"[5:4]\", resetValue: 1}\n",
        &ResolveOptions::default(),
    )
    .unwrap();
    let engine = RegisterEngine::new(Arc::new(model), MemoryBus::new());
    let r = engine.register("b.R").unwrap();
    assert_eq!(engine.reset_value(&r), 0x1A);
}

#[test]
fn unknown_names() {
    let engine = engine();
    assert!(matches!(
        engine.register("uart.NOPE"),
        Err(RuntimeError::UnknownRegister { .. })
    ));
    let ctrl = engine.register("uart.CTRL").unwrap();
    assert!(matches!(
        engine.read_field(&ctrl, "NOPE"),
        Err(RuntimeError::UnknownField { .. })
    ));
}

#[test]
fn transport_faults_pass_through() {
    let model = resolve_str(DOC, &ResolveOptions::default()).unwrap();
    let engine = RegisterEngine::new(Arc::new(model), MemoryBus::new().with_fault(0x1000));
    let ctrl = engine.register("uart.CTRL").unwrap();
    assert!(matches!(
        engine.read(&ctrl),
        Err(RuntimeError::Transport(_))
    ));
}
