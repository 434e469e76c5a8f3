//! # Operation Module
//!
//! The closed allow-list of remote operations and the request type that
//! carries one through the queue.
//!
//! An operation name outside the allow-list never becomes an `Operation`,
//! so it is rejected before any network activity.

use crate::PsynthError;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Parameters of a remote operation, keyed by field name.
pub type Params = BTreeMap<String, String>;

macro_rules! operations {
    ($($variant:ident => $name:literal,)+) => {
        /// Remote operations the service accepts.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Operation {
            $($variant,)+
        }

        impl Operation {
            /// Every allowed operation, in wire-name order of the service's list.
            pub const ALL: &'static [Operation] = &[$(Operation::$variant,)+];

            /// Get the wire name.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Operation::$variant => $name,)+
                }
            }
        }

        impl FromStr for Operation {
            type Err = PsynthError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(Operation::$variant),)+
                    other => Err(PsynthError::UnknownOperation(other.to_string())),
                }
            }
        }
    };
}

operations! {
    // graph lifecycle
    CreateMap => "createmap",
    GetFileList => "getfilelist",
    RenameMap => "renamemap",
    GetWholeGraph => "getwholegraph",
    SetGraphName => "setgraphname",
    GetGraphName => "getgraphname",
    SessionQuit => "sessionquit",
    SavePrefs => "saveprefs",
    // entity mutation
    NewNode => "newnode",
    BatchNodes => "batchnodes",
    DelNode => "delnode",
    UpdateNode => "updatenode",
    NewRel => "newrel",
    BatchRels => "batchrels",
    DelRel => "delrel",
    UpdateRel => "updaterel",
    NewRelType => "newreltype",
    UpdateRelType => "updatereltype",
    NewDetail => "newdetail",
    DelDetail => "deldetail",
    UpdateDetail => "updatedetail",
    Tag => "tag",
    // layout
    SetDrawParams => "setdrawparams",
    DrawGraph => "drawgraph",
    GetAllPos => "getallpos",
    ExportToImage => "exporttoimage",
    Publish => "publish",
    // auxiliary, read-mostly
    NewComment => "newcomment",
    GetComments => "getcomments",
    NodePlusOne => "nodeplusone",
    Interconnections => "interconnections",
    ExpandSelection => "expandselection",
    GetHeat => "getheat",
    ShortestPath => "shortestpath",
    ChatMessage => "chatmessage",
    GetChat => "getchat",
    GetQueue => "getqueue",
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A remote operation together with its parameters.
///
/// Session identity (user, key, filename) is not part of a request; it is
/// attached at dispatch time.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// The operation to execute.
    pub operation: Operation,
    /// Operation-specific parameters.
    pub params: Params,
}

impl Request {
    /// Create a request with no parameters.
    #[must_use]
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            params: Params::new(),
        }
    }

    /// Create a request with an existing parameter map.
    #[must_use]
    pub fn with_params(operation: Operation, params: Params) -> Self {
        Self { operation, params }
    }

    /// Create a request from an operation name, checking the allow-list.
    pub fn named(name: &str, params: Params) -> Result<Self, PsynthError> {
        Ok(Self::with_params(name.parse()?, params))
    }

    /// Add one parameter.
    #[must_use]
    pub fn param(mut self, key: &str, value: impl ToString) -> Self {
        self.params.insert(key.to_string(), value.to_string());
        self
    }

    /// Read a parameter.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

// =============================================================================
// TESTS
// =============================================================================
