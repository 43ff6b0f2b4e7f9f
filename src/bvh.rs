//! Single-frame motion document parser.
//!
//! The format is a hierarchical skeleton description (`HIERARCHY` block with
//! nested `ROOT`/`JOINT` entries, per-joint `OFFSET` and `CHANNELS` lines and
//! terminal `End Site` markers) followed by a `MOTION` block declaring exactly
//! one frame of whitespace-separated channel values.
//!
//! Joints are stored in an arena (`Vec<JointNode>` + name map); parent/child
//! links are indices into it. The channel sequence records, in declaration
//! order, which joint and channel each frame value belongs to.

use std::collections::HashMap;

use glam::Vec3;

use crate::error::{AnymError, Result};
use crate::math::RotationOrder;

/// The fixed 22-joint skeleton used by the pose import path and the remote
/// service. Ends at the `MOTION` keyword; callers append the frame
/// declaration and value line.
pub const MOTION_HEADER: &str = "\
HIERARCHY
ROOT Hips
{
	OFFSET 0.000000 0.000000 0.000000
	CHANNELS 6 Xposition Yposition Zposition Zrotation Yrotation Xrotation
	JOINT LeftHip
	{
		OFFSET 0.080781 0.005359 -0.054022
		CHANNELS 3 Zrotation Yrotation Xrotation
		JOINT LeftKnee
		{
			OFFSET 0.000000 -0.010000 -0.417793
			CHANNELS 3 Zrotation Yrotation Xrotation
			JOINT LeftFoot
			{
				OFFSET 0.000000 0.000000 -0.401472
				CHANNELS 3 Zrotation Yrotation Xrotation
				JOINT LeftToe
				{
					OFFSET 0.011334 -0.104165 -0.041164
					CHANNELS 3 Zrotation Yrotation Xrotation
					End Site
					{
						OFFSET 0.000000 -0.150000 0.000000
					}
				}
			}
		}
	}
	JOINT RightHip
	{
		OFFSET -0.080781 0.005359 -0.054025
		CHANNELS 3 Zrotation Yrotation Xrotation
		JOINT RightKnee
		{
			OFFSET 0.000000 -0.010000 -0.417793
			CHANNELS 3 Zrotation Yrotation Xrotation
			JOINT RightFoot
			{
				OFFSET 0.000000 0.000000 -0.401472
				CHANNELS 3 Zrotation Yrotation Xrotation
				JOINT RightToe
				{
					OFFSET -0.011334 -0.104165 -0.041168
					CHANNELS 3 Zrotation Yrotation Xrotation
					End Site
					{
						OFFSET 0.000000 -0.150000 0.000000
					}
				}
			}
		}
	}
	JOINT Spine
	{
		OFFSET 0.000000 0.011802 0.097172
		CHANNELS 3 Zrotation Yrotation Xrotation
		JOINT Spine1
		{
			OFFSET 0.000000 0.013769 0.113368
			CHANNELS 3 Zrotation Yrotation Xrotation
			JOINT Spine2
			{
				OFFSET 0.000000 0.015737 0.129563
				CHANNELS 3 Zrotation Yrotation Xrotation
				JOINT Neck
				{
					OFFSET 0.000000 0.017704 0.145760
					CHANNELS 3 Zrotation Yrotation Xrotation
					JOINT Head
					{
						OFFSET 0.000000 -0.019722 0.067202
						CHANNELS 3 Zrotation Yrotation Xrotation
						End Site
						{
							OFFSET 0.000000 0.000000 0.200000
						}
					}
				}
				JOINT LeftShoulder
				{
					OFFSET 0.061401 0.017995 0.098779
					CHANNELS 3 Zrotation Yrotation Xrotation
					JOINT LeftArm
					{
						OFFSET 0.115589 0.000581 0.000000
						CHANNELS 3 Zrotation Yrotation Xrotation
						JOINT LeftForearm
						{
							OFFSET 0.255608 0.010000 0.000000
							CHANNELS 3 Zrotation Yrotation Xrotation
							JOINT LeftHand
							{
								OFFSET 0.234041 -0.010000 0.000000
								CHANNELS 3 Zrotation Yrotation Xrotation
								End Site
								{
									OFFSET 0.200000 0.000000 0.000000
								}
							}
						}
					}
				}
				JOINT RightShoulder
				{
					OFFSET -0.061401 0.017414 0.098778
					CHANNELS 3 Zrotation Yrotation Xrotation
					JOINT RightArm
					{
						OFFSET -0.115589 -0.000581 0.000000
						CHANNELS 3 Zrotation Yrotation Xrotation
						JOINT RightForearm
						{
							OFFSET -0.255711 0.010000 0.000000
							CHANNELS 3 Zrotation Yrotation Xrotation
							JOINT RightHand
							{
								OFFSET -0.234017 -0.010000 0.000000
								CHANNELS 3 Zrotation Yrotation Xrotation
								End Site
								{
									OFFSET -0.200000 0.000000 0.000000
								}
							}
						}
					}
				}
			}
		}
	}
}
MOTION
";

/// Number of non-terminal joints in [`MOTION_HEADER`].
pub const HEADER_JOINT_COUNT: usize = 22;

/// A single motion channel of a joint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Xposition,
    Yposition,
    Zposition,
    Xrotation,
    Yrotation,
    Zrotation,
}

impl Channel {
    /// Case-insensitive token lookup.
    pub fn from_token(token: &str) -> Option<Channel> {
        match token.to_ascii_lowercase().as_str() {
            "xposition" => Some(Channel::Xposition),
            "yposition" => Some(Channel::Yposition),
            "zposition" => Some(Channel::Zposition),
            "xrotation" => Some(Channel::Xrotation),
            "yrotation" => Some(Channel::Yrotation),
            "zrotation" => Some(Channel::Zrotation),
            _ => None,
        }
    }

    pub fn is_rotation(self) -> bool {
        matches!(
            self,
            Channel::Xrotation | Channel::Yrotation | Channel::Zrotation
        )
    }

    /// 0 = X, 1 = Y, 2 = Z for rotation channels, `None` for positions.
    pub fn rotation_axis_index(self) -> Option<u8> {
        match self {
            Channel::Xrotation => Some(0),
            Channel::Yrotation => Some(1),
            Channel::Zrotation => Some(2),
            _ => None,
        }
    }
}

/// One node of the parsed joint tree. End sites are stored as terminal nodes
/// named `<parent>_EndSite`; they never carry channels and produce no bone.
#[derive(Debug, Clone)]
pub struct JointNode {
    pub name: String,
    pub parent: Option<usize>,
    /// Offset from the parent joint, already scaled.
    pub offset: Vec3,
    /// Channels in declaration order.
    pub channels: Vec<Channel>,
    /// Euler order derived from the rotation channels.
    pub rotation_order: RotationOrder,
    pub children: Vec<usize>,
    pub is_end_site: bool,
}

/// Knobs for [`MotionDocument::parse`].
#[derive(Debug, Clone, Copy)]
pub struct ParseOptions {
    /// Uniform factor applied to every offset (and later to root positions).
    pub scale: f32,
    /// When set, a frame value line whose length differs from the channel
    /// sequence is a fatal error instead of being handled leniently during
    /// distribution.
    pub strict_frame_values: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            scale: 1.0,
            strict_frame_values: false,
        }
    }
}

/// A parsed single-frame motion document.
#[derive(Debug, Clone)]
pub struct MotionDocument {
    pub joints: Vec<JointNode>,
    pub root: usize,
    /// `(joint index, channel)` per frame value, in declaration order.
    pub channel_sequence: Vec<(usize, Channel)>,
    pub frame_values: Vec<f32>,
}

impl MotionDocument {
    /// Parses document text in a single left-to-right scan.
    pub fn parse(text: &str, options: &ParseOptions) -> Result<MotionDocument> {
        let mut joints: Vec<JointNode> = Vec::new();
        let mut by_name: HashMap<String, usize> = HashMap::new();
        let mut channel_sequence: Vec<(usize, Channel)> = Vec::new();
        let mut stack: Vec<usize> = Vec::new();
        let mut root: Option<usize> = None;

        let mut lines = text.lines();
        let mut in_hierarchy = false;
        let mut motion_reached = false;

        for line in lines.by_ref() {
            let parts: Vec<&str> = line.split_whitespace().collect();
            let Some(&keyword) = parts.first() else {
                continue;
            };

            match keyword {
                "HIERARCHY" => in_hierarchy = true,
                "ROOT" | "JOINT" if in_hierarchy => {
                    if parts.len() < 2 {
                        return Err(AnymError::Format(format!("{keyword} without a name")));
                    }
                    let name = parts[1..].join(" ");
                    let parent = if keyword == "ROOT" {
                        if root.is_some() {
                            return Err(AnymError::Format(
                                "more than one ROOT joint".to_string(),
                            ));
                        }
                        None
                    } else {
                        Some(*stack.last().ok_or_else(|| {
                            AnymError::Format(format!("JOINT '{name}' outside of a ROOT block"))
                        })?)
                    };

                    let idx = push_joint(&mut joints, &mut by_name, name, parent, false)?;
                    match parent {
                        Some(p) => joints[p].children.push(idx),
                        None => root = Some(idx),
                    }
                    stack.push(idx);
                }
                "End" if parts.get(1) == Some(&"Site") => {
                    let parent = *stack.last().ok_or_else(|| {
                        AnymError::Format("End Site outside of a joint block".to_string())
                    })?;
                    let name = format!("{}_EndSite", joints[parent].name);
                    let idx = push_joint(&mut joints, &mut by_name, name, Some(parent), true)?;
                    joints[parent].children.push(idx);
                    stack.push(idx);
                }
                "OFFSET" => {
                    let cur = *stack.last().ok_or_else(|| {
                        AnymError::Format("OFFSET outside of a joint block".to_string())
                    })?;
                    if parts.len() != 4 {
                        return Err(AnymError::Format(format!(
                            "OFFSET of joint '{}' needs three components",
                            joints[cur].name
                        )));
                    }
                    joints[cur].offset = Vec3::new(
                        parse_float(parts[1])?,
                        parse_float(parts[2])?,
                        parse_float(parts[3])?,
                    ) * options.scale;
                }
                "CHANNELS" => {
                    let cur = *stack.last().ok_or_else(|| {
                        AnymError::Format("CHANNELS outside of a joint block".to_string())
                    })?;
                    read_channels(&mut joints, &mut channel_sequence, cur, &parts)?;
                }
                "{" | "}" => {
                    if keyword == "}" {
                        stack.pop();
                    }
                }
                "MOTION" => {
                    motion_reached = true;
                    break;
                }
                _ => {}
            }
        }

        if !motion_reached {
            return Err(AnymError::Format("missing MOTION section".to_string()));
        }
        let root = root.ok_or_else(|| AnymError::Format("no ROOT joint declared".to_string()))?;
        if !stack.is_empty() {
            return Err(AnymError::Format(
                "unbalanced braces in hierarchy".to_string(),
            ));
        }

        let frame_values = read_single_frame(lines)?;
        if options.strict_frame_values && frame_values.len() != channel_sequence.len() {
            return Err(AnymError::FrameValueCount {
                expected: channel_sequence.len(),
                actual: frame_values.len(),
            });
        }

        log::debug!(
            "parsed motion document: {} joints, {} channels, {} frame values",
            joints.len(),
            channel_sequence.len(),
            frame_values.len()
        );

        Ok(MotionDocument {
            joints,
            root,
            channel_sequence,
            frame_values,
        })
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.joints.iter().position(|j| j.name == name)
    }

    pub fn joint(&self, name: &str) -> Option<&JointNode> {
        self.index_of(name).map(|i| &self.joints[i])
    }

    /// Joints that produce bones (everything except end sites).
    pub fn bone_joint_count(&self) -> usize {
        self.joints.iter().filter(|j| !j.is_end_site).count()
    }
}

fn push_joint(
    joints: &mut Vec<JointNode>,
    by_name: &mut HashMap<String, usize>,
    name: String,
    parent: Option<usize>,
    is_end_site: bool,
) -> Result<usize> {
    if by_name.contains_key(&name) {
        return Err(AnymError::Format(format!("duplicate joint name '{name}'")));
    }
    if let Some(p) = parent {
        if joints[p].is_end_site {
            return Err(AnymError::Format(format!(
                "joint '{name}' nested inside an End Site"
            )));
        }
    }
    let idx = joints.len();
    by_name.insert(name.clone(), idx);
    joints.push(JointNode {
        name,
        parent,
        offset: Vec3::ZERO,
        channels: Vec::new(),
        rotation_order: RotationOrder::DEFAULT,
        children: Vec::new(),
        is_end_site,
    });
    Ok(idx)
}

fn read_channels(
    joints: &mut [JointNode],
    channel_sequence: &mut Vec<(usize, Channel)>,
    cur: usize,
    parts: &[&str],
) -> Result<()> {
    let name = joints[cur].name.clone();
    if joints[cur].is_end_site {
        return Err(AnymError::Format(format!(
            "End Site '{name}' declares channels"
        )));
    }

    let declared: usize = parts
        .get(1)
        .and_then(|n| n.parse().ok())
        .ok_or_else(|| AnymError::Format(format!("bad CHANNELS count for joint '{name}'")))?;
    let tokens = &parts[2..];
    if tokens.len() != declared {
        return Err(AnymError::Format(format!(
            "joint '{name}' declares {declared} channels but lists {}",
            tokens.len()
        )));
    }

    let mut rotation_axes: [Option<u8>; 3] = [None; 3];
    let mut rotation_count = 0usize;
    let mut position_count = 0usize;

    for token in tokens {
        let channel = Channel::from_token(token)
            .ok_or_else(|| AnymError::Format(format!("unknown channel '{token}'")))?;
        match channel.rotation_axis_index() {
            Some(axis) => {
                if rotation_count >= 3 {
                    return Err(AnymError::RotationOrder { joint: name });
                }
                rotation_axes[rotation_count] = Some(axis);
                rotation_count += 1;
            }
            None => {
                position_count += 1;
                if position_count > 3 {
                    return Err(AnymError::Format(format!(
                        "joint '{name}' declares more than three position channels"
                    )));
                }
            }
        }
        joints[cur].channels.push(channel);
        channel_sequence.push((cur, channel));
    }

    joints[cur].rotation_order = RotationOrder::from_axis_indices(rotation_axes)
        .ok_or(AnymError::RotationOrder { joint: name })?;
    Ok(())
}

fn read_single_frame<'a>(lines: impl Iterator<Item = &'a str>) -> Result<Vec<f32>> {
    let mut declared = false;
    for line in lines {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("Frames:") {
            let count: usize = rest.trim().parse().map_err(|_| {
                AnymError::Format(format!("bad frame count '{}'", rest.trim()))
            })?;
            if count != 1 {
                return Err(AnymError::FrameCount { declared: count });
            }
            declared = true;
            continue;
        }
        if trimmed.starts_with("Frame Time:") {
            continue;
        }
        if declared {
            return trimmed
                .split_whitespace()
                .map(parse_float)
                .collect::<Result<Vec<f32>>>();
        }
    }
    if declared {
        Err(AnymError::Format("missing frame value line".to_string()))
    } else {
        Err(AnymError::Format(
            "missing frame count declaration".to_string(),
        ))
    }
}

fn parse_float(token: &str) -> Result<f32> {
    token
        .parse::<f32>()
        .map_err(|_| AnymError::Format(format!("invalid numeric value '{token}'")))
}
