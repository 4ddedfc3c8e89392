// Keyexpand Input Layer - Event Processing Utilities
// Event type checking for decoded frames

/// EV_SYN event type code
pub const EV_SYN: u16 = 0x00;

/// EV_KEY event type code from input-event-codes.h
pub const EV_KEY: u16 = 0x01;

/// Check if an event is a key event.
///
/// Key events have event.type == EV_KEY (0x01)
pub fn is_key_event(event_type: u16) -> bool {
    event_type == EV_KEY
}
