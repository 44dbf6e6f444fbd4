mod keypoints;
mod observation;
mod progress;
mod reward;
mod termination;
