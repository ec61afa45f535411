//! Lua scripts that move messages between Redis structures atomically.
//!
//! Every state change of a stored message (locking, completing, dead-lettering,
//! lock expiry) happens inside exactly one script, so a crash or a dropped
//! future can never leave a message outside every structure.

/// Reclaim expired locks, then lock up to `#tokens` ready messages.
///
/// KEYS[1] = ready zset of the sub-queue
/// KEYS[2] = locks zset of the sub-queue (score = lock expiry, ms)
/// KEYS[3] = lock token hash of the sub-queue
/// KEYS[4] = delivery count hash
/// KEYS[5] = record hash
/// KEYS[6] = dead-letter reason hash
/// KEYS[7] = active index zset
/// KEYS[8] = dead-letter index zset
/// KEYS[9] = dead-letter ready zset
/// ARGV[1] = now (ms)
/// ARGV[2] = lock expiry for newly locked messages (ms)
/// ARGV[3] = max delivery count, `0` for unlimited
/// ARGV[4] = "1" when exhausted messages move to the dead-letter sub-queue
/// ARGV[5] = dead-letter reason for exhausted messages
/// ARGV[6..] = one lock token per message to lock
///
/// Returns one `{seq, token, delivery_count, record, reason}` row per locked
/// message; `reason` is empty when the message was never dead-lettered.
pub(super) const RECEIVE: &str = r#"
    local ready_key = KEYS[1]
    local locks_key = KEYS[2]
    local tokens_key = KEYS[3]
    local deliveries_key = KEYS[4]
    local records_key = KEYS[5]
    local reasons_key = KEYS[6]
    local limit = tonumber(ARGV[3])

    local expired = redis.call('ZRANGEBYSCORE', locks_key, '-inf', ARGV[1])
    for _, seq in ipairs(expired) do
        redis.call('ZREM', locks_key, seq)
        redis.call('HDEL', tokens_key, seq)
        local count = tonumber(redis.call('HGET', deliveries_key, seq) or '0')
        if ARGV[4] == '1' and limit > 0 and count >= limit then
            redis.call('ZREM', KEYS[7], seq)
            redis.call('ZADD', KEYS[8], seq, seq)
            redis.call('ZADD', KEYS[9], seq, seq)
            redis.call('HSET', reasons_key, seq, cjson.encode({
                reason = ARGV[5],
                description = 'Message was delivered ' .. count .. ' times',
            }))
        else
            redis.call('ZADD', ready_key, seq, seq)
        end
    end

    local wanted = #ARGV - 5
    local received = {}
    if wanted < 1 then
        return received
    end

    local ids = redis.call('ZRANGE', ready_key, 0, wanted - 1)
    for i, seq in ipairs(ids) do
        local token = ARGV[5 + i]
        redis.call('ZREM', ready_key, seq)
        redis.call('ZADD', locks_key, ARGV[2], seq)
        redis.call('HSET', tokens_key, seq, token)
        local count = redis.call('HINCRBY', deliveries_key, seq, 1)
        local record = redis.call('HGET', records_key, seq) or ''
        local reason = redis.call('HGET', reasons_key, seq) or ''
        received[#received + 1] = { tonumber(seq), token, count, record, reason }
    end
    return received
"#;

/// Delete a locked message for good.
///
/// KEYS[1] = locks zset of the sub-queue
/// KEYS[2] = lock token hash of the sub-queue
/// KEYS[3] = index zset of the sub-queue
/// KEYS[4] = record hash
/// KEYS[5] = delivery count hash
/// KEYS[6] = dead-letter reason hash
/// ARGV[1] = seq
/// ARGV[2] = lock token
/// ARGV[3] = now (ms)
///
/// Returns 1 when completed, 0 when the lock was lost or has expired.
pub(super) const COMPLETE: &str = r#"
    local seq = ARGV[1]
    if redis.call('HGET', KEYS[2], seq) ~= ARGV[2] then
        return 0
    end
    local locked_until = tonumber(redis.call('ZSCORE', KEYS[1], seq) or '0')
    if locked_until <= tonumber(ARGV[3]) then
        return 0
    end

    redis.call('ZREM', KEYS[1], seq)
    redis.call('HDEL', KEYS[2], seq)
    redis.call('ZREM', KEYS[3], seq)
    redis.call('HDEL', KEYS[4], seq)
    redis.call('HDEL', KEYS[5], seq)
    redis.call('HDEL', KEYS[6], seq)
    return 1
"#;

/// Move a locked active message to the dead-letter sub-queue.
///
/// KEYS[1] = active locks zset
/// KEYS[2] = active lock token hash
/// KEYS[3] = active index zset
/// KEYS[4] = dead-letter index zset
/// KEYS[5] = dead-letter ready zset
/// KEYS[6] = dead-letter reason hash
/// ARGV[1] = seq
/// ARGV[2] = lock token
/// ARGV[3] = now (ms)
/// ARGV[4] = reason, JSON encoded
///
/// Returns 1 when moved, 0 when the lock was lost or has expired.
pub(super) const DEAD_LETTER: &str = r#"
    local seq = ARGV[1]
    if redis.call('HGET', KEYS[2], seq) ~= ARGV[2] then
        return 0
    end
    local locked_until = tonumber(redis.call('ZSCORE', KEYS[1], seq) or '0')
    if locked_until <= tonumber(ARGV[3]) then
        return 0
    end

    redis.call('ZREM', KEYS[1], seq)
    redis.call('HDEL', KEYS[2], seq)
    redis.call('ZREM', KEYS[3], seq)
    redis.call('ZADD', KEYS[4], seq, seq)
    redis.call('ZADD', KEYS[5], seq, seq)
    redis.call('HSET', KEYS[6], seq, ARGV[4])
    return 1
"#;

/// Read one page of a sub-queue past a sequence cursor.
///
/// KEYS[1] = index zset of the sub-queue
/// KEYS[2] = record hash
/// KEYS[3] = delivery count hash
/// KEYS[4] = dead-letter reason hash
/// ARGV[1] = cursor, exclusive
/// ARGV[2] = page size
///
/// Returns one `{seq, record, delivery_count, reason}` row per message.
pub(super) const PEEK: &str = r#"
    local ids = redis.call('ZRANGEBYSCORE', KEYS[1], '(' .. ARGV[1], '+inf', 'LIMIT', 0, ARGV[2])
    local page = {}
    for _, seq in ipairs(ids) do
        local record = redis.call('HGET', KEYS[2], seq) or ''
        local count = tonumber(redis.call('HGET', KEYS[3], seq) or '0')
        local reason = redis.call('HGET', KEYS[4], seq) or ''
        page[#page + 1] = { tonumber(seq), record, count, reason }
    end
    return page
"#;
