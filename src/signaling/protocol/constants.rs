/// Separates the sub-fields of an `ICE` argument:
/// `ICE <sdpMid>|<sdpMLineIndex>|<candidate>`.
pub const FIELD_SEP: char = '|';

/// Separates identifiers in `ONLINE_USERS`.
pub const LIST_SEP: char = ',';

/// Largest text frame accepted from a client. SDP bodies stay well below this.
pub const MAX_FRAME_LEN: usize = 64 * 1024;

/// Read limit for the WebSocket layer. Text up to this size is still read and
/// answered with an ERROR when it exceeds `MAX_FRAME_LEN`; anything larger
/// ends the connection before it is buffered.
pub const MAX_WIRE_MESSAGE_LEN: usize = 4 * MAX_FRAME_LEN;

/// Longest accepted client identifier, in bytes.
pub const MAX_CLIENT_ID_LEN: usize = 64;
