// Copyright 2025 the Rangekit Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Behaviour of the typed properties through the public API.
//!
//! Each test drives one property the way a driver and a protocol layer
//! would, checking stored bytes, text forms and emitted signals together.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use rangekit_property::{
    BitFieldProperty, BufferProperty, EnumProperty, EnumStorage, ErrorKind, FloatProperty,
    IntegerProperty, PropertyDescriptor, PropertyId, PropertyKind, SignalKind, SignalSet,
    TextEncoding, TextProperty,
};

fn descriptor(id: u32) -> PropertyDescriptor {
    PropertyDescriptor::builder(PropertyId::new(id)).build()
}

fn value_changes<P: PropertyKind>(property: &P) -> Rc<Cell<u32>> {
    let hits = Rc::new(Cell::new(0));
    let sink = hits.clone();
    property.subscribe(SignalKind::ValueChanged.into(), move |_| {
        sink.set(sink.get() + 1);
    });
    hits
}

#[test]
fn bitfield_bit_round_trip_and_exclusivity() {
    let mut bits = BitFieldProperty::new(descriptor(1), 1).unwrap();
    bits.set_value(0, 0b0100_0001).unwrap();
    let original = bits.value(0).unwrap();

    bits.set_bit(0, 3).unwrap();
    assert!(bits.bit_state(0, 3).unwrap());
    bits.reset_bit(0, 3).unwrap();
    assert_eq!(bits.value(0).unwrap(), original);

    bits.set_exclusivity_mask(0b0000_0110);
    bits.set_bit(0, 1).unwrap();
    let err = bits.set_bit(0, 2).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Logic);
    assert!(!bits.bit_state(0, 2).unwrap());
}

#[test]
fn bitfield_wildcards_leave_bits_alone() {
    let mut bits = BitFieldProperty::new(descriptor(1), 1).unwrap();
    bits.set_value(0, 0b1010_1010).unwrap();
    bits.set_string_value(0, "xxxx0101").unwrap();
    assert_eq!(bits.string_value(0).unwrap(), "10100101");
}

#[test]
fn integer_limits_and_clipping() {
    let mut integer = IntegerProperty::new(descriptor(2), 2, true).unwrap();
    integer.set_limits(-100, 100).unwrap();

    let err = integer.set_value(0, 150).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutOfRange);
    assert!(!integer.is_initialized());

    integer.set_value(0, 80).unwrap();
    let kinds = Rc::new(RefCell::new(Vec::new()));
    let sink = kinds.clone();
    integer.subscribe(SignalSet::ALL, move |signal| sink.borrow_mut().push(signal.kind));

    integer.set_limits(-50, 50).unwrap();
    assert_eq!(integer.value(0).unwrap(), 50);
    assert_eq!(
        *kinds.borrow(),
        [SignalKind::LimitsChanged, SignalKind::ValueChanged]
    );
}

#[test]
fn integer_narrowing_reads() {
    let mut integer = IntegerProperty::new(descriptor(2), 4, true).unwrap();
    integer.set_value(0, -1).unwrap();
    assert_eq!(integer.value_as::<i8>(0).unwrap(), -1);
    assert_eq!(integer.value_as::<u32>(0).unwrap_err().kind(), ErrorKind::OutOfRange);

    integer.set_value(0, 300).unwrap();
    assert_eq!(integer.value_as::<u8>(0).unwrap_err().kind(), ErrorKind::OutOfRange);
    assert_eq!(integer.value_as::<u16>(0).unwrap(), 300);
    assert_eq!(integer.string_value_radix(0, 16).unwrap(), "12c");
}

#[test]
fn scaled_float_text_and_raw_value() {
    let mut float = FloatProperty::new(descriptor(3), 4, 100, 2).unwrap();
    float.set_string_value(0, "3.14").unwrap();
    assert_eq!(float.string_value(0).unwrap(), "3.14");
    assert_eq!(float.raw_value(0).unwrap(), 314);
    assert_eq!(float.storage(), &314_i32.to_le_bytes());
}

#[test]
fn float_text_write_with_same_rendering_is_silent() {
    let mut float = FloatProperty::new(descriptor(3), 4, 0, 2).unwrap();
    float.set_value(0, 1.5).unwrap();
    let hits = value_changes(&float);
    float.set_string_value(0, "1.50").unwrap();
    float.set_string_value(0, "1.501").unwrap();
    assert_eq!(hits.get(), 0);
    float.set_string_value(0, "1.6").unwrap();
    assert_eq!(hits.get(), 1);
}

#[test]
fn enum_label_lookup() {
    let mut baud = EnumProperty::new(descriptor(4), 4, EnumStorage::Value).unwrap();
    baud.add_enum_pair(9600, "9600").unwrap();
    baud.add_enum_pair(115_200, "115200").unwrap();

    baud.set_string_value(0, "9600").unwrap();
    assert_eq!(baud.value(0).unwrap(), 9600);
    assert_eq!(baud.value_index(0).unwrap(), 0);
    assert!(baud.set_string_value(0, "4800").is_err());
    assert_eq!(baud.value(0).unwrap(), 9600);
}

#[test]
fn enum_index_mode_stores_positions() {
    let mut mode = EnumProperty::new(descriptor(4), 1, EnumStorage::Index).unwrap();
    mode.add_enum_pair(10, "near").unwrap();
    mode.add_enum_pair(20, "far").unwrap();
    mode.set_value(0, 20).unwrap();
    assert_eq!(mode.storage(), &[1]);
    assert_eq!(mode.string_value(0).unwrap(), "far");
}

#[test]
fn buffer_hex_text() {
    let mut buffer = BufferProperty::new(descriptor(5), 4).unwrap();
    buffer.set_string_value(0, "0A1B").unwrap();
    assert_eq!(buffer.string_value(0).unwrap(), "0A1B");
    assert_eq!(buffer.value(0).unwrap(), &[0x0A, 0x1B, 0, 0]);

    let err = buffer.set_string_value(0, "0011223344").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutOfRange);
}

#[test]
fn text_encodings() {
    let mut ascii = TextProperty::new(descriptor(6), 8, TextEncoding::Ascii).unwrap();
    ascii.set_value(0, "M16").unwrap();
    assert_eq!(ascii.storage(), b"M16\0\0\0\0\0");
    assert_eq!(ascii.set_value(0, "über").unwrap_err().kind(), ErrorKind::InvalidArgument);

    let mut wide = TextProperty::new(descriptor(7), 8, TextEncoding::Utf16).unwrap();
    wide.set_value(0, "ab").unwrap();
    assert_eq!(&wide.storage()[..4], &[b'a', 0, b'b', 0]);
    assert_eq!(wide.value(0).unwrap(), "ab");
}

#[test]
fn read_only_properties_accept_forced_writes() {
    let descriptor = PropertyDescriptor::builder(PropertyId::new(8))
        .editable(false)
        .build();
    let mut integer = IntegerProperty::new(descriptor, 1, false).unwrap();

    let err = integer.set_value(0, 3).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PolicyViolation);
    assert!(integer.storage().is_empty());

    integer.force_value(0, 3).unwrap();
    assert_eq!(integer.value(0).unwrap(), 3);

    // The gate still applies after a forced write.
    assert!(integer.set_value(0, 4).is_err());
    // Forced writes still validate.
    assert!(integer.force_value(0, 300).is_err());
    assert_eq!(integer.value(0).unwrap(), 3);
}

#[test]
fn uninitialized_reads_fail() {
    let integer = IntegerProperty::new(descriptor(9), 2, false).unwrap();
    assert_eq!(integer.value(0).unwrap_err().kind(), ErrorKind::PolicyViolation);
}

#[test]
fn dirty_state_machine() {
    let mut integer = IntegerProperty::new(descriptor(10), 2, false).unwrap();
    assert!(!integer.is_initialized());
    assert!(!integer.is_modified());

    integer.set_value(0, 7).unwrap();
    assert!(integer.is_modified());
    integer.set_clean();
    assert!(!integer.is_modified());

    let hits = value_changes(&integer);
    integer.set_value(0, 9).unwrap();
    assert!(integer.is_modified());
    integer.restore();
    assert!(!integer.is_modified());
    assert_eq!(integer.value(0).unwrap(), 7);
    assert_eq!(hits.get(), 2);

    // Nothing to revert.
    integer.restore();
    assert_eq!(hits.get(), 2);
}

#[test]
fn empty_property_is_never_modified() {
    let mut integer = IntegerProperty::new(descriptor(11), 2, false).unwrap();
    integer.set_value(0, 1).unwrap();
    integer.set_count(0).unwrap();
    assert_eq!(integer.count(), 0);
    assert!(!integer.is_initialized());
    assert!(!integer.is_modified());
}

#[test]
fn oversized_count_leaves_storage_alone() {
    let mut integer = IntegerProperty::new(descriptor(13), 4, false).unwrap();
    integer.set_value(0, 21).unwrap();
    let err = integer.set_count(usize::MAX / 4 + 1).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OutOfRange);
    assert_eq!(integer.count(), 1);
    assert_eq!(integer.storage(), &[21, 0, 0, 0]);
    assert_eq!(integer.backup_storage().len(), 4);
    assert!(integer.is_initialized());
}

#[test]
fn disabled_signals_still_apply_writes() {
    let mut integer = IntegerProperty::new(descriptor(12), 2, false).unwrap();
    let hits = value_changes(&integer);
    integer.set_signals_enabled(false);
    integer.set_value(0, 5).unwrap();
    assert_eq!(integer.value(0).unwrap(), 5);
    assert_eq!(hits.get(), 0);

    integer.set_signals_enabled(true);
    integer.set_value(0, 6).unwrap();
    assert_eq!(hits.get(), 1);
}
