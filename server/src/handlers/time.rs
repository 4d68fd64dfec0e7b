use rti_shared::{
    MessageBody, MessageContext, MessageSink, MessageType, ResponseBody, RtiError, SinkPlugin,
};

use crate::{
    federation::Federation,
    handlers::{checked, member, mismatched},
};

pub struct TimePlugin;

impl SinkPlugin<Federation> for TimePlugin {
    fn build(&self, sink: &mut MessageSink<Federation>) {
        sink.add_handler(MessageType::EnableTimeRegulation, "enable-regulation", checked(enable_regulation))
            .add_handler(MessageType::DisableTimeRegulation, "disable-regulation", checked(disable_regulation))
            .add_handler(MessageType::EnableTimeConstrained, "enable-constrained", checked(enable_constrained))
            .add_handler(
                MessageType::DisableTimeConstrained,
                "disable-constrained",
                checked(disable_constrained),
            )
            .add_handler(MessageType::EnableAsyncDelivery, "enable-async", checked(async_delivery))
            .add_handler(MessageType::DisableAsyncDelivery, "disable-async", checked(async_delivery))
            .add_handler(MessageType::ModifyLookahead, "modify-lookahead", checked(modify_lookahead))
            .add_handler(MessageType::TimeAdvanceRequest, "advance", checked(time_advance_request));
    }
}

fn enable_regulation(federation: &mut Federation, context: &mut MessageContext) -> Result<(), RtiError> {
    let source = member(federation, context)?;
    let MessageBody::EnableTimeRegulation { time, lookahead } = context.request().body else {
        return Err(mismatched(context));
    };
    let (time, lookahead) = federation.time.enable_regulation(source, time, lookahead)?;
    context.success_with(ResponseBody::Time { time, lookahead });
    Ok(())
}

fn disable_regulation(federation: &mut Federation, context: &mut MessageContext) -> Result<(), RtiError> {
    let source = member(federation, context)?;
    let grants = federation.time.disable_regulation(source)?;
    federation.send_grants(grants);
    context.success();
    Ok(())
}

fn enable_constrained(federation: &mut Federation, context: &mut MessageContext) -> Result<(), RtiError> {
    let source = member(federation, context)?;
    let time = federation.time.enable_constrained(source)?;
    let lookahead = federation
        .time
        .status(source)
        .map(|status| status.lookahead)
        .unwrap_or_default();
    context.success_with(ResponseBody::Time { time, lookahead });
    Ok(())
}

fn disable_constrained(federation: &mut Federation, context: &mut MessageContext) -> Result<(), RtiError> {
    let source = member(federation, context)?;
    let grants = federation.time.disable_constrained(source)?;
    federation.send_grants(grants);
    context.success();
    Ok(())
}

fn async_delivery(federation: &mut Federation, context: &mut MessageContext) -> Result<(), RtiError> {
    let source = member(federation, context)?;
    let enabled = matches!(context.request().body, MessageBody::EnableAsyncDelivery);
    federation.time.set_asynchronous(source, enabled)?;
    context.success();
    Ok(())
}

fn modify_lookahead(federation: &mut Federation, context: &mut MessageContext) -> Result<(), RtiError> {
    let source = member(federation, context)?;
    let MessageBody::ModifyLookahead { lookahead } = context.request().body else {
        return Err(mismatched(context));
    };
    let (lookahead, grants) = federation.time.modify_lookahead(source, lookahead)?;
    let time = federation
        .time
        .status(source)
        .map(|status| status.current_time)
        .unwrap_or_default();
    federation.send_grants(grants);
    context.success_with(ResponseBody::Time { time, lookahead });
    Ok(())
}

/// Flush queue requests are treated like plain advance requests here; the
/// LRC has already drained its queue up to the requested time
fn time_advance_request(federation: &mut Federation, context: &mut MessageContext) -> Result<(), RtiError> {
    let source = member(federation, context)?;
    let MessageBody::TimeAdvanceRequest { time, kind } = context.request().body else {
        return Err(mismatched(context));
    };
    let grants = federation.time.time_advance_request(source, time, kind)?;
    federation.send_grants(grants);
    context.success();
    Ok(())
}
