use {
    crate::envs::{
        Action,
        Observation,
    },
    strum::Display,
};

pub const DEFAULT_REWARD: f64 = -1.0;
pub const DEFAULT_DISCOUNT: f64 = 0.99;

/// Where a state sits in the trajectory of an episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub enum StateType {
    #[default]
    None,
    Initial,
    Active,
    End,
}

/// One time step of an episode trajectory.
///
/// The driver creates a state from an observation, asks the agent for an
/// action, and fills in the action, the observation it led to and the reward
/// before handing the state to the agent for storage.
///
/// # Fields
/// * `state_id` - The id of the state, the driver uses the 1-based episode number.
/// * `observation` - The observation the step starts from.
/// * `transitioned_observation` - The observation the chosen action led to.
/// * `transition` - The chosen action.
/// * `reward` - The reward for the chosen action.
/// * `discount` - The discount factor.
/// * `state_type` - The position in the trajectory, see [`EpisodeState::set_state_type`].
///
/// # Example
/// ```
/// use candle_core::{DType, Device, Tensor};
/// use episodic_rl::engines::{EpisodeState, StateType};
/// use episodic_rl::envs::Observation;
///
/// let screen = Tensor::zeros(2, DType::F32, &Device::Cpu).unwrap();
/// let observation = Observation::single("screen_buffer", screen);
/// let mut state = EpisodeState::new(1, observation, StateType::Initial);
/// assert_eq!(state.reward(), -1.0);
///
/// state.set_state_type(StateType::End);
/// assert_eq!(state.state_type(), StateType::Initial);
/// state.set_state_type(StateType::Active);
/// state.set_state_type(StateType::End);
/// assert!(state.is_end_state());
/// ```
#[derive(Debug, Clone)]
pub struct EpisodeState {
    state_id: usize,
    observation: Observation,
    transitioned_observation: Option<Observation>,
    transition: Option<Action>,
    reward: f64,
    discount: f64,
    state_type: StateType,
}
impl EpisodeState {
    /// Create a state of any type. Only later changes are restricted.
    pub fn new(
        state_id: usize,
        observation: Observation,
        state_type: StateType,
    ) -> Self {
        Self {
            state_id,
            observation,
            transitioned_observation: None,
            transition: None,
            reward: DEFAULT_REWARD,
            discount: DEFAULT_DISCOUNT,
            state_type,
        }
    }

    pub fn with_discount(
        mut self,
        discount: f64,
    ) -> Self {
        self.discount = discount;
        self
    }

    pub fn state_id(&self) -> usize {
        self.state_id
    }

    pub fn observation(&self) -> &Observation {
        &self.observation
    }

    pub fn transitioned_observation(&self) -> Option<&Observation> {
        self.transitioned_observation.as_ref()
    }

    pub fn set_transitioned_observation(
        &mut self,
        observation: Observation,
    ) {
        self.transitioned_observation = Some(observation);
    }

    pub fn transition(&self) -> Option<&Action> {
        self.transition.as_ref()
    }

    pub fn set_transition(
        &mut self,
        action: Action,
    ) {
        self.transition = Some(action);
    }

    pub fn reward(&self) -> f64 {
        self.reward
    }

    pub fn set_reward(
        &mut self,
        reward: f64,
    ) {
        self.reward = reward;
    }

    pub fn discount(&self) -> f64 {
        self.discount
    }

    pub fn state_type(&self) -> StateType {
        self.state_type
    }

    /// Move the state along `None -> Initial -> Active -> End`.
    ///
    /// `None` is accepted from anywhere, every other type only from its
    /// predecessor. Anything else is ignored.
    pub fn set_state_type(
        &mut self,
        state_type: StateType,
    ) {
        let accepted = match state_type {
            StateType::None => true,
            StateType::Initial => self.state_type == StateType::None,
            StateType::Active => self.state_type == StateType::Initial,
            StateType::End => self.state_type == StateType::Active,
        };
        if accepted {
            self.state_type = state_type;
        }
    }

    pub fn is_initial_state(&self) -> bool {
        self.state_type == StateType::Initial
    }

    pub fn is_end_state(&self) -> bool {
        self.state_type == StateType::End
    }
}

impl PartialEq for EpisodeState {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        self.state_id == other.state_id
    }
}
