use {
    crate::components::TensorSpec,
    anyhow::{
        anyhow,
        Result,
    },
    std::fmt::Display,
};

/// An action in a discrete action space.
///
/// Games with independent buttons (move left, move right, attack, ...) can be
/// driven with [`Action::Buttons`], where every combination of pressed buttons
/// is a separate action. Everything else uses plain indices.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Action {
    Discrete(usize),
    Buttons(Vec<bool>),
}

impl Display for Action {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            Self::Discrete(i) => write!(f, "Discrete({i})"),
            Self::Buttons(buttons) => {
                let pressed: String = buttons.iter().map(|&b| if b { '1' } else { '0' }).collect();
                write!(f, "Buttons({pressed})")
            }
        }
    }
}

/// Enumerate the actions of a game from its action space descriptor.
///
/// The descriptor must be one dimensional, `[n]` with `n > 0` and an integer
/// dtype. With `one_hot` every on/off combination of the `n` buttons becomes
/// an action (`2^n` in total), otherwise the actions are `Discrete(0..n)`.
///
/// # Example
/// ```
/// use candle_core::DType;
/// use episodic_rl::components::TensorSpec;
/// use episodic_rl::envs::{build_action_space, Action};
///
/// let spec = TensorSpec::new("action_space", DType::U32, &[2]);
/// let plain = build_action_space(&spec, false).unwrap();
/// assert_eq!(plain, vec![Action::Discrete(0), Action::Discrete(1)]);
///
/// let buttons = build_action_space(&spec, true).unwrap();
/// assert_eq!(buttons.len(), 4);
/// assert_eq!(buttons[3], Action::Buttons(vec![true, true]));
/// ```
pub fn build_action_space(
    spec: &TensorSpec,
    one_hot: bool,
) -> Result<Vec<Action>> {
    let n = match spec.shape() {
        [n] if spec.dtype().is_int() => *n,
        _ => Err(anyhow!("action descriptor {spec} is specifying a non discrete space"))?,
    };
    if n == 0 {
        Err(anyhow!("action descriptor {spec} has no actions"))?
    }

    if one_hot {
        if n >= usize::BITS as usize {
            Err(anyhow!("too many buttons ({n}) to enumerate their combinations"))?
        }
        Ok((0..1usize << n)
            .map(|combination| {
                Action::Buttons(
                    (0..n)
                        .map(|button| combination >> (n - 1 - button) & 1 == 1)
                        .collect(),
                )
            })
            .collect())
    } else {
        Ok((0..n).map(Action::Discrete).collect())
    }
}
