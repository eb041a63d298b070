//! # Components
//!
//! This module contains the components that can be used to build an agent.
//!
//! ## Replay Buffer
//!
//! The [`ReplayBuffer`] struct implements a uniform ring-buffer replay memory,
//! which is used by off-policy agents such as [`crate::agents::QAgent`]. It is
//! shared between the driver and the training worker as a
//! [`SharedReplayBuffer`], networks only get a read-only [`MemoryReader`].
//!
//! ## Exploration
//!
//! The [`ExplorationSchedule`] maps the episode number to the probability of
//! taking a random action.
//!
//! ## Frame Stacking
//!
//! The [`FrameStack`] keeps the last few frames of an image observation so
//! that an agent can perceive motion. Before stacking, a [`ScreenTransform`]
//! can rescale screens and convert them to a single channel.

mod exploration;
mod frame_stack;
mod memory_access;
mod replay_buffer;
mod screen;
mod tensor_spec;

pub use exploration::ExplorationSchedule;
pub use frame_stack::{
    stacked_shape,
    FrameStack,
};
pub use memory_access::{
    Batches,
    MemoryReader,
};
pub use replay_buffer::{
    Batch,
    ReplayBuffer,
    SharedReplayBuffer,
    TransitionId,
    A_BUFFER_NAME,
    R_BUFFER_NAME,
    S1_BUFFER_NAME,
    S2_BUFFER_NAME,
    T_BUFFER_NAME,
};
pub use screen::ScreenTransform;
pub use tensor_spec::TensorSpec;
