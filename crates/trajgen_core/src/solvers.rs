use crate::traits::{OdeSystem, Scalar, Steppable};

/// Classic fixed-step Runge-Kutta 4th order.
///
/// Stage buffers are owned by the solver so repeated stepping performs no
/// allocation.
pub struct RK4<T: Scalar> {
    k1: Vec<T>,
    k2: Vec<T>,
    k3: Vec<T>,
    k4: Vec<T>,
    tmp: Vec<T>,
}

impl<T: Scalar> RK4<T> {
    pub fn new(dim: usize) -> Self {
        let zero = T::zero();
        Self {
            k1: vec![zero; dim],
            k2: vec![zero; dim],
            k3: vec![zero; dim],
            k4: vec![zero; dim],
            tmp: vec![zero; dim],
        }
    }
}

impl<T: Scalar> Steppable<T> for RK4<T> {
    fn step(&mut self, system: &impl OdeSystem<T>, t: &mut T, state: &mut [T], dt: T) {
        let half = T::from_f64(0.5).unwrap();
        let sixth = T::from_f64(1.0 / 6.0).unwrap();
        let two = T::from_f64(2.0).unwrap();
        let t0 = *t;

        system.rhs(t0, state, &mut self.k1);

        for i in 0..state.len() {
            self.tmp[i] = state[i] + dt * half * self.k1[i];
        }
        system.rhs(t0 + dt * half, &self.tmp, &mut self.k2);

        for i in 0..state.len() {
            self.tmp[i] = state[i] + dt * half * self.k2[i];
        }
        system.rhs(t0 + dt * half, &self.tmp, &mut self.k3);

        for i in 0..state.len() {
            self.tmp[i] = state[i] + dt * self.k3[i];
        }
        system.rhs(t0 + dt, &self.tmp, &mut self.k4);

        for i in 0..state.len() {
            state[i] = state[i]
                + dt * sixth * (self.k1[i] + two * self.k2[i] + two * self.k3[i] + self.k4[i]);
        }

        *t = t0 + dt;
    }
}

// Tsitouras 5(4) tableau. Node positions, stage coefficients (row i holds
// a_{i+2,1..=i+1}), and the 5th-order weights.
const TSIT5_C: [f64; 5] = [0.161, 0.327, 0.9, 0.9800255409045097, 1.0];
const TSIT5_A: [&[f64]; 5] = [
    &[0.161],
    &[-0.008480655492356989, 0.335480655492357],
    &[2.898, -6.359447987781783, 4.361447987781783],
    &[
        5.325864858437957,
        -11.748883564062828,
        7.495539342889693,
        -0.09249506636030195,
    ],
    &[
        5.86145544294642,
        -12.92096931784711,
        8.159367898576159,
        -0.071584973281401,
        -0.02826857949054663,
    ],
];
const TSIT5_B: [f64; 6] = [
    0.09646076681806523,
    0.01,
    0.4798896504144996,
    1.379008574103742,
    -3.290069515436099,
    2.324710524099774,
];

/// Tsitouras 5(4) method, used here as a fixed-step 5th-order integrator.
pub struct Tsit5<T: Scalar> {
    stages: [Vec<T>; 6],
    tmp: Vec<T>,
}

impl<T: Scalar> Tsit5<T> {
    pub fn new(dim: usize) -> Self {
        let zero = T::zero();
        Self {
            stages: std::array::from_fn(|_| vec![zero; dim]),
            tmp: vec![zero; dim],
        }
    }
}

impl<T: Scalar> Steppable<T> for Tsit5<T> {
    fn step(&mut self, system: &impl OdeSystem<T>, t: &mut T, state: &mut [T], dt: T) {
        let t0 = *t;

        system.rhs(t0, state, &mut self.stages[0]);

        for s in 0..5 {
            let coeffs = TSIT5_A[s];
            for i in 0..state.len() {
                let mut increment = T::zero();
                for (j, &a) in coeffs.iter().enumerate() {
                    increment = increment + T::from_f64(a).unwrap() * self.stages[j][i];
                }
                self.tmp[i] = state[i] + dt * increment;
            }
            let tc = t0 + dt * T::from_f64(TSIT5_C[s]).unwrap();
            system.rhs(tc, &self.tmp, &mut self.stages[s + 1]);
        }

        for i in 0..state.len() {
            let mut increment = T::zero();
            for (j, &b) in TSIT5_B.iter().enumerate() {
                increment = increment + T::from_f64(b).unwrap() * self.stages[j][i];
            }
            state[i] = state[i] + dt * increment;
        }

        *t = t0 + dt;
    }
}
