pub mod request;
pub mod response;

pub use request::{methods, JsonRpcRequest, ResourceReadParams, RpcId, ToolCallParams};
pub use response::{JsonRpcError, JsonRpcResponse, ResponseShapeError, RpcOutcome};
