//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements                         | Connects to          |
//! |------------|------------------------------------|----------------------|
//! | `log_sink` | EventSink                          | `log` facade         |
//! | `sim`      | AxisDriver, InputPin, DelayNs,     | Simulated machine    |
//! |            | Clock, ControlChannel, ToolPort    |                      |

pub mod log_sink;
pub mod sim;
