// Flash memory protocol (FMP) handler.
//
// A thin command/reply dispatcher spoken over a framed link: requests arrive
// as [opcode, args...], replies go out as [opcode, status, param count,
// param lengths and payloads...]. Only the memory-information request is
// implemented; every other opcode gets a fixed error acknowledgment. The
// handler keeps no state beyond its region table and has no retry logic.

use std::collections::HashMap;

// Frame type under which FMP traffic travels on the link.
pub const FRAME_FMP: u8 = 0x02;

// Reply status codes.
pub const OK: u8 = 0x00;
pub const EBADRQC: u8 = 0x38;

pub mod opcode {
    pub const ACK: u8     = 0x00;
    pub const MEMINFO: u8 = 0x01;
    pub const DUMP: u8    = 0x02;
    pub const FLASH: u8   = 0x03;
    pub const READ: u8    = 0x04;
    pub const WRITE: u8   = 0x05;
    pub const LIST: u8    = 0x06;
    pub const MOVE: u8    = 0x07;
    pub const COPY: u8    = 0x08;
    pub const MKDIR: u8   = 0x09;
    pub const RM: u8      = 0x0a;
    pub const RESET: u8   = 0xff;
}

// Outbound side of the framed transport.
pub trait FrameLink {
    fn send(&mut self, frame_type: u8, data: &[u8]);
}

pub trait ProtocolHandler {
    fn handle_frame(&mut self, data: &[u8], link: &mut dyn FrameLink);
}

// One flash memory region advertised in the MemInfo reply. Serialized as
// size (little endian), flags, then the zero-padded name.
pub struct MemInfo {
    pub name:  [u8; 16],
    pub flags: u8,
    pub size:  u32,
}

impl MemInfo {
    pub fn new(name: &str, flags: u8, size: u32) -> Self {
        let mut name_bytes = [0; 16];
        for (dst, src) in name_bytes.iter_mut().zip(name.bytes()) {
            *dst = src;
        }

        MemInfo {
            name:  name_bytes,
            flags: flags,
            size:  size,
        }
    }

    fn to_bytes(&self) -> [u8; 21] {
        let mut bytes = [0; 21];
        bytes[0..4].copy_from_slice(&self.size.to_le_bytes());
        bytes[4] = self.flags;
        bytes[5..21].copy_from_slice(&self.name);
        bytes
    }
}

pub struct FmpHandler {
    regions: Vec<MemInfo>,
}

impl FmpHandler {
    pub fn new(regions: Vec<MemInfo>) -> Self {
        FmpHandler { regions: regions }
    }

    fn send_ack(&self, status: u8, link: &mut dyn FrameLink) {
        link.send(FRAME_FMP, &[opcode::ACK, status, 0]);
    }

    fn op_mem_info(&self, link: &mut dyn FrameLink) {
        let mut reply = vec![opcode::MEMINFO, OK, self.regions.len() as u8];
        for region in &self.regions {
            let bytes = region.to_bytes();
            reply.push(bytes.len() as u8);
            reply.extend_from_slice(&bytes);
        }

        link.send(FRAME_FMP, &reply);
    }
}

impl ProtocolHandler for FmpHandler {
    fn handle_frame(&mut self, data: &[u8], link: &mut dyn FrameLink) {
        match data.first() {
            Some(&opcode::MEMINFO) => self.op_mem_info(link),
            _                      => self.send_ack(EBADRQC, link),
        }
    }
}

// Frame-type keyed dispatch, standing in for the transceiver's link layer.
// Handlers register when a protocol comes up and unregister when it goes
// away; frames with no registered handler are dropped.
pub struct LinkDispatcher {
    handlers: HashMap<u8, Box<dyn ProtocolHandler>>,
}

impl LinkDispatcher {
    pub fn new() -> Self {
        LinkDispatcher {
            handlers: HashMap::new(),
        }
    }

    pub fn register(&mut self, frame_type: u8, handler: Box<dyn ProtocolHandler>) {
        self.handlers.insert(frame_type, handler);
    }

    pub fn unregister(&mut self, frame_type: u8) {
        self.handlers.remove(&frame_type);
    }

    // Returns false if no handler is registered for the frame type.
    pub fn dispatch(&mut self, frame_type: u8, data: &[u8], link: &mut dyn FrameLink) -> bool {
        match self.handlers.get_mut(&frame_type) {
            Some(handler) => {
                handler.handle_frame(data, link);
                true
            },
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct VecLink {
        frames: Vec<(u8, Vec<u8>)>,
    }

    impl VecLink {
        fn new() -> Self {
            VecLink { frames: Vec::new() }
        }
    }

    impl FrameLink for VecLink {
        fn send(&mut self, frame_type: u8, data: &[u8]) {
            self.frames.push((frame_type, data.to_vec()));
        }
    }

    #[test]
    fn test_unknown_opcode_gets_error_ack() {
        let mut handler = FmpHandler::new(Vec::new());
        let mut link = VecLink::new();

        handler.handle_frame(&[opcode::DUMP], &mut link);

        assert_eq!(link.frames.len(), 1);
        assert_eq!(link.frames[0].0, FRAME_FMP);
        assert_eq!(link.frames[0].1, vec![opcode::ACK, EBADRQC, 0]);
    }

    #[test]
    fn test_empty_frame_gets_error_ack() {
        let mut handler = FmpHandler::new(Vec::new());
        let mut link = VecLink::new();

        handler.handle_frame(&[], &mut link);

        assert_eq!(link.frames[0].1, vec![opcode::ACK, EBADRQC, 0]);
    }

    #[test]
    fn test_mem_info_reply_layout() {
        let regions = vec![
            MemInfo::new("ext flash", 0x01, 16 * 1024 * 1024),
            MemInfo::new("eeprom", 0x03, 64 * 1024),
        ];
        let mut handler = FmpHandler::new(regions);
        let mut link = VecLink::new();

        handler.handle_frame(&[opcode::MEMINFO], &mut link);

        let reply = &link.frames[0].1;
        assert_eq!(reply[0], opcode::MEMINFO);
        assert_eq!(reply[1], OK);
        assert_eq!(reply[2], 2);

        // First descriptor: length prefix, then size/flags/name.
        assert_eq!(reply[3], 21);
        assert_eq!(&reply[4..8], &(16u32 * 1024 * 1024).to_le_bytes());
        assert_eq!(reply[8], 0x01);
        assert_eq!(&reply[9..18], b"ext flash");

        // Second descriptor right after the first.
        assert_eq!(reply[25], 21);
        assert_eq!(reply.len(), 3 + 2 * 22);
    }

    #[test]
    fn test_dispatcher_register_unregister() {
        let mut dispatcher = LinkDispatcher::new();
        let mut link = VecLink::new();

        assert!(!dispatcher.dispatch(FRAME_FMP, &[opcode::MEMINFO], &mut link));

        dispatcher.register(FRAME_FMP, Box::new(FmpHandler::new(Vec::new())));
        assert!(dispatcher.dispatch(FRAME_FMP, &[opcode::MEMINFO], &mut link));
        assert_eq!(link.frames.len(), 1);

        dispatcher.unregister(FRAME_FMP);
        assert!(!dispatcher.dispatch(FRAME_FMP, &[opcode::MEMINFO], &mut link));
        assert_eq!(link.frames.len(), 1);
    }
}
