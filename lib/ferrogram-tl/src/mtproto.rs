// Copyright 2026 - developers of the `ferrogram` project.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Hand-written definitions for the MTProto service schema.
//!
//! Unlike the API schema, which changes with every layer and calls for
//! generated code, the service vocabulary is small and stable, so the
//! definitions used by the sender are maintained by hand. The
//! conventions match what a generator would emit: bare `types`, boxed
//! `enums` and `functions`.

/// Looks up the name of a known constructor identifier, for logging.
pub fn name_for_id(id: u32) -> &'static str {
    use crate::Identifiable;

    match id {
        types::MsgsAck::CONSTRUCTOR_ID => "msgs_ack",
        types::BadMsgNotification::CONSTRUCTOR_ID => "bad_msg_notification",
        types::BadServerSalt::CONSTRUCTOR_ID => "bad_server_salt",
        types::MsgsStateReq::CONSTRUCTOR_ID => "msgs_state_req",
        types::MsgsStateInfo::CONSTRUCTOR_ID => "msgs_state_info",
        types::MsgsAllInfo::CONSTRUCTOR_ID => "msgs_all_info",
        types::MsgDetailedInfo::CONSTRUCTOR_ID => "msg_detailed_info",
        types::MsgNewDetailedInfo::CONSTRUCTOR_ID => "msg_new_detailed_info",
        types::MsgResendReq::CONSTRUCTOR_ID => "msg_resend_req",
        types::Pong::CONSTRUCTOR_ID => "pong",
        types::NewSessionCreated::CONSTRUCTOR_ID => "new_session_created",
        types::FutureSalt::CONSTRUCTOR_ID => "future_salt",
        types::FutureSalts::CONSTRUCTOR_ID => "future_salts",
        types::RpcError::CONSTRUCTOR_ID => "rpc_error",
        types::upload::File::CONSTRUCTOR_ID => "upload.file",
        functions::Ping::CONSTRUCTOR_ID => "ping",
        functions::PingDelayDisconnect::CONSTRUCTOR_ID => "ping_delay_disconnect",
        functions::GetFutureSalts::CONSTRUCTOR_ID => "get_future_salts",
        functions::auth::LogOut::CONSTRUCTOR_ID => "auth.logOut",
        _ => "(unknown)",
    }
}

/// Bare types, each represented by a `struct`. They serialize their
/// fields only; the constructor identifier is written by the enclosing
/// [`crate::enums`] variant.
pub mod types {
    use crate::deserialize::{Cursor, Result};
    use crate::{Deserializable, Identifiable, RawVec, Serializable};

    /// `msgs_ack#62d6b459 msg_ids:Vector<long> = MsgsAck;`
    #[derive(Clone, Debug, PartialEq)]
    pub struct MsgsAck {
        pub msg_ids: Vec<i64>,
    }

    impl Identifiable for MsgsAck {
        const CONSTRUCTOR_ID: u32 = 0x62d6b459;
    }

    impl Serializable for MsgsAck {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            self.msg_ids.serialize(buf);
        }
    }

    impl Deserializable for MsgsAck {
        fn deserialize(buf: &mut Cursor) -> Result<Self> {
            Ok(Self {
                msg_ids: Vec::deserialize(buf)?,
            })
        }
    }

    /// `bad_msg_notification#a7eff811 bad_msg_id:long bad_msg_seqno:int
    /// error_code:int = BadMsgNotification;`
    #[derive(Clone, Debug, PartialEq)]
    pub struct BadMsgNotification {
        pub bad_msg_id: i64,
        pub bad_msg_seqno: i32,
        pub error_code: i32,
    }

    impl Identifiable for BadMsgNotification {
        const CONSTRUCTOR_ID: u32 = 0xa7eff811;
    }

    impl Serializable for BadMsgNotification {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            self.bad_msg_id.serialize(buf);
            self.bad_msg_seqno.serialize(buf);
            self.error_code.serialize(buf);
        }
    }

    impl Deserializable for BadMsgNotification {
        fn deserialize(buf: &mut Cursor) -> Result<Self> {
            Ok(Self {
                bad_msg_id: i64::deserialize(buf)?,
                bad_msg_seqno: i32::deserialize(buf)?,
                error_code: i32::deserialize(buf)?,
            })
        }
    }

    /// `bad_server_salt#edab447b bad_msg_id:long bad_msg_seqno:int
    /// error_code:int new_server_salt:long = BadMsgNotification;`
    #[derive(Clone, Debug, PartialEq)]
    pub struct BadServerSalt {
        pub bad_msg_id: i64,
        pub bad_msg_seqno: i32,
        pub error_code: i32,
        pub new_server_salt: i64,
    }

    impl Identifiable for BadServerSalt {
        const CONSTRUCTOR_ID: u32 = 0xedab447b;
    }

    impl Serializable for BadServerSalt {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            self.bad_msg_id.serialize(buf);
            self.bad_msg_seqno.serialize(buf);
            self.error_code.serialize(buf);
            self.new_server_salt.serialize(buf);
        }
    }

    impl Deserializable for BadServerSalt {
        fn deserialize(buf: &mut Cursor) -> Result<Self> {
            Ok(Self {
                bad_msg_id: i64::deserialize(buf)?,
                bad_msg_seqno: i32::deserialize(buf)?,
                error_code: i32::deserialize(buf)?,
                new_server_salt: i64::deserialize(buf)?,
            })
        }
    }

    /// `msgs_state_req#da69fb52 msg_ids:Vector<long> = MsgsStateReq;`
    #[derive(Clone, Debug, PartialEq)]
    pub struct MsgsStateReq {
        pub msg_ids: Vec<i64>,
    }

    impl Identifiable for MsgsStateReq {
        const CONSTRUCTOR_ID: u32 = 0xda69fb52;
    }

    impl Serializable for MsgsStateReq {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            self.msg_ids.serialize(buf);
        }
    }

    impl Deserializable for MsgsStateReq {
        fn deserialize(buf: &mut Cursor) -> Result<Self> {
            Ok(Self {
                msg_ids: Vec::deserialize(buf)?,
            })
        }
    }

    /// `msgs_state_info#04deb57d req_msg_id:long info:bytes = MsgsStateInfo;`
    #[derive(Clone, Debug, PartialEq)]
    pub struct MsgsStateInfo {
        pub req_msg_id: i64,
        pub info: Vec<u8>,
    }

    impl Identifiable for MsgsStateInfo {
        const CONSTRUCTOR_ID: u32 = 0x04deb57d;
    }

    impl Serializable for MsgsStateInfo {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            self.req_msg_id.serialize(buf);
            self.info.serialize(buf);
        }
    }

    impl Deserializable for MsgsStateInfo {
        fn deserialize(buf: &mut Cursor) -> Result<Self> {
            Ok(Self {
                req_msg_id: i64::deserialize(buf)?,
                info: Vec::<u8>::deserialize(buf)?,
            })
        }
    }

    /// `msgs_all_info#8cc0d131 msg_ids:Vector<long> info:bytes = MsgsAllInfo;`
    #[derive(Clone, Debug, PartialEq)]
    pub struct MsgsAllInfo {
        pub msg_ids: Vec<i64>,
        pub info: Vec<u8>,
    }

    impl Identifiable for MsgsAllInfo {
        const CONSTRUCTOR_ID: u32 = 0x8cc0d131;
    }

    impl Serializable for MsgsAllInfo {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            self.msg_ids.serialize(buf);
            self.info.serialize(buf);
        }
    }

    impl Deserializable for MsgsAllInfo {
        fn deserialize(buf: &mut Cursor) -> Result<Self> {
            Ok(Self {
                msg_ids: Vec::deserialize(buf)?,
                info: Vec::<u8>::deserialize(buf)?,
            })
        }
    }

    /// `msg_detailed_info#276d3ec6 msg_id:long answer_msg_id:long
    /// bytes:int status:int = MsgDetailedInfo;`
    #[derive(Clone, Debug, PartialEq)]
    pub struct MsgDetailedInfo {
        pub msg_id: i64,
        pub answer_msg_id: i64,
        pub bytes: i32,
        pub status: i32,
    }

    impl Identifiable for MsgDetailedInfo {
        const CONSTRUCTOR_ID: u32 = 0x276d3ec6;
    }

    impl Serializable for MsgDetailedInfo {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            self.msg_id.serialize(buf);
            self.answer_msg_id.serialize(buf);
            self.bytes.serialize(buf);
            self.status.serialize(buf);
        }
    }

    impl Deserializable for MsgDetailedInfo {
        fn deserialize(buf: &mut Cursor) -> Result<Self> {
            Ok(Self {
                msg_id: i64::deserialize(buf)?,
                answer_msg_id: i64::deserialize(buf)?,
                bytes: i32::deserialize(buf)?,
                status: i32::deserialize(buf)?,
            })
        }
    }

    /// `msg_new_detailed_info#809db6df answer_msg_id:long bytes:int
    /// status:int = MsgDetailedInfo;`
    #[derive(Clone, Debug, PartialEq)]
    pub struct MsgNewDetailedInfo {
        pub answer_msg_id: i64,
        pub bytes: i32,
        pub status: i32,
    }

    impl Identifiable for MsgNewDetailedInfo {
        const CONSTRUCTOR_ID: u32 = 0x809db6df;
    }

    impl Serializable for MsgNewDetailedInfo {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            self.answer_msg_id.serialize(buf);
            self.bytes.serialize(buf);
            self.status.serialize(buf);
        }
    }

    impl Deserializable for MsgNewDetailedInfo {
        fn deserialize(buf: &mut Cursor) -> Result<Self> {
            Ok(Self {
                answer_msg_id: i64::deserialize(buf)?,
                bytes: i32::deserialize(buf)?,
                status: i32::deserialize(buf)?,
            })
        }
    }

    /// `msg_resend_req#7d861a08 msg_ids:Vector<long> = MsgResendReq;`
    #[derive(Clone, Debug, PartialEq)]
    pub struct MsgResendReq {
        pub msg_ids: Vec<i64>,
    }

    impl Identifiable for MsgResendReq {
        const CONSTRUCTOR_ID: u32 = 0x7d861a08;
    }

    impl Serializable for MsgResendReq {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            self.msg_ids.serialize(buf);
        }
    }

    impl Deserializable for MsgResendReq {
        fn deserialize(buf: &mut Cursor) -> Result<Self> {
            Ok(Self {
                msg_ids: Vec::deserialize(buf)?,
            })
        }
    }

    /// `pong#347773c5 msg_id:long ping_id:long = Pong;`
    #[derive(Clone, Debug, PartialEq)]
    pub struct Pong {
        pub msg_id: i64,
        pub ping_id: i64,
    }

    impl Identifiable for Pong {
        const CONSTRUCTOR_ID: u32 = 0x347773c5;
    }

    impl Serializable for Pong {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            self.msg_id.serialize(buf);
            self.ping_id.serialize(buf);
        }
    }

    impl Deserializable for Pong {
        fn deserialize(buf: &mut Cursor) -> Result<Self> {
            Ok(Self {
                msg_id: i64::deserialize(buf)?,
                ping_id: i64::deserialize(buf)?,
            })
        }
    }

    /// `new_session_created#9ec20908 first_msg_id:long unique_id:long
    /// server_salt:long = NewSession;`
    #[derive(Clone, Debug, PartialEq)]
    pub struct NewSessionCreated {
        pub first_msg_id: i64,
        pub unique_id: i64,
        pub server_salt: i64,
    }

    impl Identifiable for NewSessionCreated {
        const CONSTRUCTOR_ID: u32 = 0x9ec20908;
    }

    impl Serializable for NewSessionCreated {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            self.first_msg_id.serialize(buf);
            self.unique_id.serialize(buf);
            self.server_salt.serialize(buf);
        }
    }

    impl Deserializable for NewSessionCreated {
        fn deserialize(buf: &mut Cursor) -> Result<Self> {
            Ok(Self {
                first_msg_id: i64::deserialize(buf)?,
                unique_id: i64::deserialize(buf)?,
                server_salt: i64::deserialize(buf)?,
            })
        }
    }

    /// `future_salt#0949d9dc valid_since:int valid_until:int salt:long
    /// = FutureSalt;`
    #[derive(Clone, Debug, PartialEq)]
    pub struct FutureSalt {
        pub valid_since: i32,
        pub valid_until: i32,
        pub salt: i64,
    }

    impl Identifiable for FutureSalt {
        const CONSTRUCTOR_ID: u32 = 0x0949d9dc;
    }

    impl Serializable for FutureSalt {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            self.valid_since.serialize(buf);
            self.valid_until.serialize(buf);
            self.salt.serialize(buf);
        }
    }

    impl Deserializable for FutureSalt {
        fn deserialize(buf: &mut Cursor) -> Result<Self> {
            Ok(Self {
                valid_since: i32::deserialize(buf)?,
                valid_until: i32::deserialize(buf)?,
                salt: i64::deserialize(buf)?,
            })
        }
    }

    /// `future_salts#ae500895 req_msg_id:long now:int
    /// salts:vector<future_salt> = FutureSalts;`
    #[derive(Clone, Debug, PartialEq)]
    pub struct FutureSalts {
        pub req_msg_id: i64,
        pub now: i32,
        pub salts: Vec<FutureSalt>,
    }

    impl Identifiable for FutureSalts {
        const CONSTRUCTOR_ID: u32 = 0xae500895;
    }

    impl Serializable for FutureSalts {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            self.req_msg_id.serialize(buf);
            self.now.serialize(buf);
            RawVec(self.salts.clone()).serialize(buf);
        }
    }

    impl Deserializable for FutureSalts {
        fn deserialize(buf: &mut Cursor) -> Result<Self> {
            Ok(Self {
                req_msg_id: i64::deserialize(buf)?,
                now: i32::deserialize(buf)?,
                salts: RawVec::<FutureSalt>::deserialize(buf)?.0,
            })
        }
    }

    /// `rpc_error#2144ca19 error_code:int error_message:string = RpcError;`
    #[derive(Clone, Debug, PartialEq)]
    pub struct RpcError {
        pub error_code: i32,
        pub error_message: String,
    }

    impl Identifiable for RpcError {
        const CONSTRUCTOR_ID: u32 = 0x2144ca19;
    }

    impl Serializable for RpcError {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            self.error_code.serialize(buf);
            self.error_message.serialize(buf);
        }
    }

    impl Deserializable for RpcError {
        fn deserialize(buf: &mut Cursor) -> Result<Self> {
            Ok(Self {
                error_code: i32::deserialize(buf)?,
                error_message: String::deserialize(buf)?,
            })
        }
    }

    pub mod upload {
        use crate::deserialize::{Cursor, Error, Result};
        use crate::{Deserializable, Identifiable, Serializable};

        /// Known `storage.FileType` constructor identifiers. The type
        /// itself is of no interest to the service layer, so the bare
        /// unit constructors are not represented as an enum.
        const FILE_TYPE_IDS: [u32; 10] = [
            0xaa963b05, // storage.fileUnknown
            0x40bc6f52, // storage.filePartial
            0x007efe0e, // storage.fileJpeg
            0xcae1aadf, // storage.fileGif
            0x0a4f63c0, // storage.filePng
            0xae1e508d, // storage.filePdf
            0x528a0677, // storage.fileMp3
            0x4b09ebbc, // storage.fileMov
            0xb3cea0e4, // storage.fileMp4
            0x1081464c, // storage.fileWebp
        ];

        /// `upload.file#096d8c96 type:storage.FileType mtime:int
        /// bytes:bytes = upload.File;`
        #[derive(Clone, Debug, PartialEq)]
        pub struct File {
            pub file_type: u32,
            pub mtime: i32,
            pub bytes: Vec<u8>,
        }

        impl Identifiable for File {
            const CONSTRUCTOR_ID: u32 = 0x096d8c96;
        }

        impl Serializable for File {
            fn serialize(&self, buf: &mut impl Extend<u8>) {
                self.file_type.serialize(buf);
                self.mtime.serialize(buf);
                self.bytes.serialize(buf);
            }
        }

        impl Deserializable for File {
            fn deserialize(buf: &mut Cursor) -> Result<Self> {
                let file_type = u32::deserialize(buf)?;
                if !FILE_TYPE_IDS.contains(&file_type) {
                    return Err(Error::UnexpectedConstructor { id: file_type });
                }
                Ok(Self {
                    file_type,
                    mtime: i32::deserialize(buf)?,
                    bytes: Vec::<u8>::deserialize(buf)?,
                })
            }
        }
    }
}

/// Boxed types, each represented by an `enum` over the constructors
/// sharing a return type. They carry the constructor identifier on the
/// wire.
pub mod enums {
    use crate::deserialize::{Cursor, Error, Result};
    use crate::{Deserializable, Identifiable, Serializable};

    macro_rules! boxed_enum {
        ($(#[$attr:meta])* $name:ident { $($variant:ident($ty:path)),+ $(,)? }) => {
            $(#[$attr])*
            #[derive(Clone, Debug, PartialEq)]
            pub enum $name {
                $($variant($ty),)+
            }

            impl Serializable for $name {
                fn serialize(&self, buf: &mut impl Extend<u8>) {
                    match self {
                        $(Self::$variant(x) => {
                            <$ty>::CONSTRUCTOR_ID.serialize(buf);
                            x.serialize(buf);
                        })+
                    }
                }
            }

            impl Deserializable for $name {
                fn deserialize(buf: &mut Cursor) -> Result<Self> {
                    let id = u32::deserialize(buf)?;
                    $(if id == <$ty>::CONSTRUCTOR_ID {
                        return Ok(Self::$variant(<$ty>::deserialize(buf)?));
                    })+
                    Err(Error::UnexpectedConstructor { id })
                }
            }

            $(impl From<$ty> for $name {
                fn from(x: $ty) -> Self {
                    Self::$variant(x)
                }
            })+
        };
    }

    boxed_enum!(MsgsAck {
        Ack(crate::types::MsgsAck),
    });

    boxed_enum!(BadMsgNotification {
        Notification(crate::types::BadMsgNotification),
        BadServerSalt(crate::types::BadServerSalt),
    });

    boxed_enum!(MsgsStateReq {
        Req(crate::types::MsgsStateReq),
    });

    boxed_enum!(MsgsStateInfo {
        Info(crate::types::MsgsStateInfo),
    });

    boxed_enum!(MsgsAllInfo {
        Info(crate::types::MsgsAllInfo),
    });

    boxed_enum!(MsgDetailedInfo {
        Info(crate::types::MsgDetailedInfo),
        MsgNewDetailedInfo(crate::types::MsgNewDetailedInfo),
    });

    boxed_enum!(MsgResendReq {
        Req(crate::types::MsgResendReq),
    });

    boxed_enum!(Pong {
        Pong(crate::types::Pong),
    });

    boxed_enum!(NewSession {
        Created(crate::types::NewSessionCreated),
    });

    boxed_enum!(FutureSalts {
        Salts(crate::types::FutureSalts),
    });

    boxed_enum!(RpcError {
        Error(crate::types::RpcError),
    });

    pub mod upload {
        use super::*;

        boxed_enum!(File {
            File(crate::types::upload::File),
        });
    }
}

/// Requests, each represented by a `struct`. They always carry their
/// constructor identifier and implement [`crate::RemoteCall`].
pub mod functions {
    use crate::{Identifiable, RemoteCall, Serializable};

    /// `ping#7abe77ec ping_id:long = Pong;`
    #[derive(Clone, Debug, PartialEq)]
    pub struct Ping {
        pub ping_id: i64,
    }

    impl Identifiable for Ping {
        const CONSTRUCTOR_ID: u32 = 0x7abe77ec;
    }

    impl Serializable for Ping {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            Self::CONSTRUCTOR_ID.serialize(buf);
            self.ping_id.serialize(buf);
        }
    }

    impl RemoteCall for Ping {
        type Return = crate::enums::Pong;
    }

    /// `ping_delay_disconnect#f3427b8c ping_id:long
    /// disconnect_delay:int = Pong;`
    #[derive(Clone, Debug, PartialEq)]
    pub struct PingDelayDisconnect {
        pub ping_id: i64,
        pub disconnect_delay: i32,
    }

    impl Identifiable for PingDelayDisconnect {
        const CONSTRUCTOR_ID: u32 = 0xf3427b8c;
    }

    impl Serializable for PingDelayDisconnect {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            Self::CONSTRUCTOR_ID.serialize(buf);
            self.ping_id.serialize(buf);
            self.disconnect_delay.serialize(buf);
        }
    }

    impl RemoteCall for PingDelayDisconnect {
        type Return = crate::enums::Pong;
    }

    /// `get_future_salts#b921bd04 num:int = FutureSalts;`
    #[derive(Clone, Debug, PartialEq)]
    pub struct GetFutureSalts {
        pub num: i32,
    }

    impl Identifiable for GetFutureSalts {
        const CONSTRUCTOR_ID: u32 = 0xb921bd04;
    }

    impl Serializable for GetFutureSalts {
        fn serialize(&self, buf: &mut impl Extend<u8>) {
            Self::CONSTRUCTOR_ID.serialize(buf);
            self.num.serialize(buf);
        }
    }

    impl RemoteCall for GetFutureSalts {
        type Return = crate::enums::FutureSalts;
    }

    pub mod auth {
        use crate::{Identifiable, RemoteCall, Serializable};

        /// `auth.logOut#3e72ba19 = Bool;`
        ///
        /// This request is never answered with an `rpc_result`; the
        /// server only acknowledges it.
        #[derive(Clone, Debug, PartialEq)]
        pub struct LogOut;

        impl Identifiable for LogOut {
            const CONSTRUCTOR_ID: u32 = 0x3e72ba19;
        }

        impl Serializable for LogOut {
            fn serialize(&self, buf: &mut impl Extend<u8>) {
                Self::CONSTRUCTOR_ID.serialize(buf);
            }
        }

        impl RemoteCall for LogOut {
            type Return = bool;
        }
    }
}
